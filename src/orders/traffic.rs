//! 디바이스 카테고리와 트래픽 계산
//!
//! 완료 시점의 트래픽은 `data_per_hour * quantity * 카테고리 계수`의 합이고,
//! 장바구니 화면의 추정치는 계수 없이 `data_per_hour * quantity`의 합입니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 디바이스 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Hub,
    Sensor,
    Bulb,
    Outlet,
    Switch,
    Other,
}

/// 이름 기반 카테고리 추론 테이블 (먼저 일치하는 항목이 우선)
const NAME_KEYWORDS: &[(DeviceCategory, &[&str])] = &[
    (DeviceCategory::Hub, &["hub", "хаб"]),
    (DeviceCategory::Sensor, &["sensor", "датчик"]),
    (DeviceCategory::Bulb, &["bulb", "lamp", "лампочка", "лампа"]),
    (DeviceCategory::Outlet, &["outlet", "plug", "socket", "розетка"]),
    (DeviceCategory::Switch, &["switch", "выключатель"]),
];

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 6] = [
        DeviceCategory::Hub,
        DeviceCategory::Sensor,
        DeviceCategory::Bulb,
        DeviceCategory::Outlet,
        DeviceCategory::Switch,
        DeviceCategory::Other,
    ];

    /// 완료 시 적용되는 트래픽 계수
    pub fn coefficient(self) -> f64 {
        match self {
            DeviceCategory::Hub => 1.3,
            DeviceCategory::Sensor => 0.7,
            DeviceCategory::Bulb => 1.1,
            DeviceCategory::Outlet => 0.9,
            DeviceCategory::Switch => 0.8,
            DeviceCategory::Other => 1.0,
        }
    }

    /// 카테고리가 지정되지 않은 디바이스 생성 시 이름에서 기본값을 추론
    pub fn infer_from_name(name: &str) -> DeviceCategory {
        let lowered = name.to_lowercase();
        NAME_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(category, _)| *category)
            .unwrap_or(DeviceCategory::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCategory::Hub => "hub",
            DeviceCategory::Sensor => "sensor",
            DeviceCategory::Bulb => "bulb",
            DeviceCategory::Outlet => "outlet",
            DeviceCategory::Switch => "switch",
            DeviceCategory::Other => "other",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("알 수 없는 디바이스 카테고리: {}", s))
    }
}

/// 트래픽 계산에 필요한 품목 정보
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficLine {
    pub data_per_hour: f64,
    pub quantity: i64,
    pub category: DeviceCategory,
}

impl TrafficLine {
    fn base(&self) -> f64 {
        self.data_per_hour * self.quantity as f64
    }
}

/// 장바구니 표시용 추정 트래픽 (계수 미적용)
pub fn estimate_traffic(lines: &[TrafficLine]) -> f64 {
    lines.iter().map(TrafficLine::base).sum()
}

/// 완료 시점의 최종 트래픽
pub fn completion_traffic(lines: &[TrafficLine]) -> f64 {
    lines
        .iter()
        .map(|line| line.base() * line.category.coefficient())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_infer_category_case_insensitive() {
        assert_eq!(DeviceCategory::infer_from_name("Hub A"), DeviceCategory::Hub);
        assert_eq!(DeviceCategory::infer_from_name("SENSOR X"), DeviceCategory::Sensor);
        assert_eq!(DeviceCategory::infer_from_name("Умная лампочка"), DeviceCategory::Bulb);
        assert_eq!(DeviceCategory::infer_from_name("Умная Розетка"), DeviceCategory::Outlet);
        assert_eq!(DeviceCategory::infer_from_name("Датчик движения"), DeviceCategory::Sensor);
        assert_eq!(DeviceCategory::infer_from_name("Wall switch"), DeviceCategory::Switch);
        assert_eq!(DeviceCategory::infer_from_name("Thermostat"), DeviceCategory::Other);
    }

    #[test]
    fn test_completion_traffic_applies_coefficients() {
        let lines = [
            TrafficLine { data_per_hour: 10.0, quantity: 2, category: DeviceCategory::Hub },
            TrafficLine { data_per_hour: 5.0, quantity: 1, category: DeviceCategory::Sensor },
        ];
        assert!(approx(completion_traffic(&lines), 29.5));
        assert!(approx(estimate_traffic(&lines), 25.0));
    }

    #[test]
    fn test_empty_order_has_zero_traffic() {
        assert_eq!(completion_traffic(&[]), 0.0);
        assert_eq!(estimate_traffic(&[]), 0.0);
    }

    #[test]
    fn test_category_parse() {
        for category in DeviceCategory::ALL {
            assert_eq!(category.as_str().parse::<DeviceCategory>().unwrap(), category);
        }
        assert!("lamp".parse::<DeviceCategory>().is_err());
    }
}
