//! Swap proposals and their state machine
use super::error::{MarketError, MarketResult};
use super::types::TimeStamp;
use chrono::Utc;

/// What the requester gives in exchange for the target item.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub enum SwapKind {
    #[n(0)]
    Direct {
        #[n(0)]
        offered_item_id: String,
    },
    #[n(1)]
    Points {
        #[n(0)]
        amount: u64,
    },
}

impl SwapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapKind::Direct { .. } => "direct",
            SwapKind::Points { .. } => "points",
        }
    }

    pub fn offered_item_id(&self) -> Option<&str> {
        match self {
            SwapKind::Direct { offered_item_id } => Some(offered_item_id),
            SwapKind::Points { .. } => None,
        }
    }

    pub fn points(&self) -> Option<u64> {
        match self {
            SwapKind::Points { amount } => Some(*amount),
            SwapKind::Direct { .. } => None,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum SwapStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
    #[n(3)]
    Cancelled,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != SwapStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SwapAction {
    Accept,
    Reject,
}

impl std::str::FromStr for SwapAction {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(SwapAction::Accept),
            "reject" => Ok(SwapAction::Reject),
            other => Err(MarketError::Validation(format!("invalid action '{other}'"))),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct SwapRequest {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub requester: String,
    #[n(2)]
    pub target_item_id: String,
    #[n(3)]
    pub kind: SwapKind,
    #[n(4)]
    pub status: SwapStatus,
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
    #[n(6)]
    pub updated_at: TimeStamp<Utc>,
    // set when an acceptance found its preconditions changed
    #[n(7)]
    pub rejection_reason: Option<String>,
}

impl SwapRequest {
    pub fn new(id: String, requester: String, target_item_id: String, kind: SwapKind) -> Self {
        let now = TimeStamp::new();
        Self {
            id,
            requester,
            target_item_id,
            kind,
            status: SwapStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == SwapStatus::Pending
    }

    pub fn accept(&mut self) -> MarketResult<()> {
        self.transition(SwapStatus::Accepted)
    }

    pub fn reject(&mut self, reason: Option<String>) -> MarketResult<()> {
        self.transition(SwapStatus::Rejected)?;
        self.rejection_reason = reason;
        Ok(())
    }

    pub fn cancel(&mut self) -> MarketResult<()> {
        self.transition(SwapStatus::Cancelled)
    }

    fn transition(&mut self, next: SwapStatus) -> MarketResult<()> {
        if self.status.is_terminal() {
            return Err(MarketError::InvalidState(format!(
                "swap {} was already {}",
                self.id,
                self.status.as_str()
            )));
        }
        self.status = next;
        self.updated_at = TimeStamp::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_swap() -> SwapRequest {
        SwapRequest::new(
            "swap_1".into(),
            "user_b".into(),
            "item_a".into(),
            SwapKind::Points { amount: 50 },
        )
    }

    #[test]
    fn terminal_states_are_final() {
        let mut swap = points_swap();
        swap.accept().unwrap();
        assert_eq!(swap.status, SwapStatus::Accepted);

        assert!(matches!(swap.reject(None), Err(MarketError::InvalidState(_))));
        assert!(matches!(swap.cancel(), Err(MarketError::InvalidState(_))));
        assert!(matches!(swap.accept(), Err(MarketError::InvalidState(_))));
        assert_eq!(swap.status, SwapStatus::Accepted);
    }

    #[test]
    fn rejection_records_reason() {
        let mut swap = points_swap();
        swap.reject(Some("balance too low".into())).unwrap();
        assert_eq!(swap.status, SwapStatus::Rejected);
        assert_eq!(swap.rejection_reason.as_deref(), Some("balance too low"));
    }

    #[test]
    fn direct_swaps_name_the_offered_item() {
        let swap = SwapRequest::new(
            "swap_2".into(),
            "user_b".into(),
            "item_a".into(),
            SwapKind::Direct {
                offered_item_id: "item_b".into(),
            },
        );
        assert_eq!(swap.kind.offered_item_id(), Some("item_b"));
        assert_eq!(swap.kind.points(), None);
        assert_eq!(swap.kind.as_str(), "direct");
    }

    #[test]
    fn actions_parse() {
        assert_eq!("accept".parse::<SwapAction>().unwrap(), SwapAction::Accept);
        assert!("maybe".parse::<SwapAction>().is_err());
    }
}
