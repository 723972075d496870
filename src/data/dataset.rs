use serde::{Deserialize, Serialize};

use crate::catalog::DeviceInput;
use crate::orders::traffic::DeviceCategory;

/// 카탈로그 초기 데이터셋
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDataset {
    pub devices: Vec<DeviceInput>,
}

fn device(
    name: &str,
    model: &str,
    avg_data_rate: f64,
    data_per_hour: f64,
    protocol: &str,
    category: DeviceCategory,
    description: &str,
    description_all: &str,
) -> DeviceInput {
    DeviceInput {
        name: name.to_string(),
        model: model.to_string(),
        avg_data_rate,
        data_per_hour,
        description: description.to_string(),
        description_all: description_all.to_string(),
        protocol: protocol.to_string(),
        category: Some(category),
    }
}

impl Default for CatalogDataset {
    fn default() -> Self {
        Self {
            devices: vec![
                device(
                    "Умная лампочка",
                    "Yeelight W3",
                    0.5,
                    1.8,
                    "Wi-Fi",
                    DeviceCategory::Bulb,
                    "RGB-лампочка с управлением со смартфона",
                    "Цветная светодиодная лампа E27 с регулировкой яркости и цветовой температуры, сценами и расписанием.",
                ),
                device(
                    "Умная розетка",
                    "Aqara Smart Plug",
                    0.3,
                    1.1,
                    "Zigbee",
                    DeviceCategory::Outlet,
                    "Розетка с учетом энергопотребления",
                    "Удаленное включение и отключение нагрузки до 2300 Вт, статистика расхода электроэнергии.",
                ),
                device(
                    "Датчик движения",
                    "Aqara Motion Sensor P1",
                    0.1,
                    0.4,
                    "Zigbee",
                    DeviceCategory::Sensor,
                    "Инфракрасный датчик присутствия",
                    "Угол обзора 170°, дальность до 7 м, датчик освещенности, работа от батареи до 5 лет.",
                ),
                device(
                    "Умный хаб",
                    "Xiaomi Smart Home Hub 2",
                    2.0,
                    7.5,
                    "Wi-Fi",
                    DeviceCategory::Hub,
                    "Центр управления умным домом",
                    "Объединяет устройства Zigbee и Bluetooth Mesh, локальные сценарии автоматизации.",
                ),
                device(
                    "Умный выключатель",
                    "Sonoff T3",
                    0.2,
                    0.7,
                    "Wi-Fi",
                    DeviceCategory::Switch,
                    "Сенсорный настенный выключатель",
                    "Двухклавишный выключатель без нейтрали с подсветкой и управлением по расписанию.",
                ),
            ],
        }
    }
}

impl CatalogDataset {
    /// JSON 파일로 저장
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
