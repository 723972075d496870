//! 주문 상태와 상태 전이
//!
//! 주문 상태는 닫힌 열거형이며 전이 함수만이 다음 상태를 만듭니다.
//! 허용되지 않는 전이는 모두 `TransitionError`로 거부됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 주문 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// 작성 중인 장바구니 (클라이언트당 하나)
    Draft,
    /// 주소가 확정되어 모더레이션 대기 중
    Formed,
    /// 모더레이터가 완료, 트래픽 합계 확정
    Completed,
    /// 모더레이터가 반려
    Rejected,
    /// 소프트 삭제
    Deleted,
}

/// 주문에 가해지는 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Form,
    Complete,
    Reject,
    Delete,
    EditItems,
    EditAddress,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderAction::Form => "form",
            OrderAction::Complete => "complete",
            OrderAction::Reject => "reject",
            OrderAction::Delete => "delete",
            OrderAction::EditItems => "edit items",
            OrderAction::EditAddress => "edit address",
        };
        f.write_str(name)
    }
}

/// 허용되지 않는 상태 전이
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{from}' 상태의 주문에는 '{action}' 동작을 수행할 수 없습니다")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub action: OrderAction,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("알 수 없는 주문 상태: {0}")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Formed,
        OrderStatus::Completed,
        OrderStatus::Rejected,
        OrderStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Formed => "formed",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Deleted => "deleted",
        }
    }

    fn reject_action(self, action: OrderAction) -> TransitionError {
        TransitionError { from: self, action }
    }

    /// draft → formed
    pub fn form(self) -> Result<OrderStatus, TransitionError> {
        match self {
            OrderStatus::Draft => Ok(OrderStatus::Formed),
            other => Err(other.reject_action(OrderAction::Form)),
        }
    }

    /// formed → completed
    pub fn complete(self) -> Result<OrderStatus, TransitionError> {
        match self {
            OrderStatus::Formed => Ok(OrderStatus::Completed),
            other => Err(other.reject_action(OrderAction::Complete)),
        }
    }

    /// formed → rejected
    pub fn reject(self) -> Result<OrderStatus, TransitionError> {
        match self {
            OrderStatus::Formed => Ok(OrderStatus::Rejected),
            other => Err(other.reject_action(OrderAction::Reject)),
        }
    }

    /// 삭제되지 않은 모든 상태 → deleted
    pub fn delete(self) -> Result<OrderStatus, TransitionError> {
        match self {
            OrderStatus::Deleted => Err(self.reject_action(OrderAction::Delete)),
            _ => Ok(OrderStatus::Deleted),
        }
    }

    /// 품목과 주소는 draft 상태에서만 수정 가능
    pub fn ensure_editable(self, action: OrderAction) -> Result<(), TransitionError> {
        match self {
            OrderStatus::Draft => Ok(()),
            other => Err(other.reject_action(action)),
        }
    }

    pub fn is_deleted(self) -> bool {
        self == OrderStatus::Deleted
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let formed = OrderStatus::Draft.form().unwrap();
        assert_eq!(formed, OrderStatus::Formed);
        assert_eq!(formed.complete().unwrap(), OrderStatus::Completed);
        assert_eq!(formed.reject().unwrap(), OrderStatus::Rejected);
    }

    #[test]
    fn test_complete_requires_formed() {
        let err = OrderStatus::Draft.complete().unwrap_err();
        assert_eq!(err.from, OrderStatus::Draft);
        assert_eq!(err.action, OrderAction::Complete);

        assert!(OrderStatus::Completed.complete().is_err());
        assert!(OrderStatus::Rejected.complete().is_err());
        assert!(OrderStatus::Deleted.complete().is_err());
    }

    #[test]
    fn test_form_only_from_draft() {
        for status in [
            OrderStatus::Formed,
            OrderStatus::Completed,
            OrderStatus::Rejected,
            OrderStatus::Deleted,
        ] {
            assert!(status.form().is_err(), "{} should not be formable", status);
        }
    }

    #[test]
    fn test_delete_from_any_live_state() {
        for status in [
            OrderStatus::Draft,
            OrderStatus::Formed,
            OrderStatus::Completed,
            OrderStatus::Rejected,
        ] {
            assert_eq!(status.delete().unwrap(), OrderStatus::Deleted);
        }
        assert!(OrderStatus::Deleted.delete().is_err());
    }

    #[test]
    fn test_only_draft_is_editable() {
        assert!(OrderStatus::Draft.ensure_editable(OrderAction::EditItems).is_ok());
        assert!(OrderStatus::Formed.ensure_editable(OrderAction::EditItems).is_err());
        assert!(OrderStatus::Completed.ensure_editable(OrderAction::EditAddress).is_err());
    }

    #[test]
    fn test_parse_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("DRAFT".parse::<OrderStatus>().is_err());
        assert!("archived".parse::<OrderStatus>().is_err());
    }
}
