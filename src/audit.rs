//! Append-only audit trail of state changes
use super::types::TimeStamp;
use chrono::Utc;

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct AuditRecord {
    #[n(0)]
    pub subject_id: String, // item, swap or account the event is about
    #[n(1)]
    pub actor_id: String,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
    #[n(3)]
    pub event: AuditEvent,
}

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub enum AuditEvent {
    #[n(0)]
    ItemListed,
    #[n(1)]
    Moderated {
        #[n(0)]
        approved: bool,
        #[n(1)]
        reason: Option<String>,
    },
    #[n(2)]
    ItemRemoved {
        #[n(0)]
        reason: Option<String>,
    },
    #[n(3)]
    SwapRequested {
        #[n(0)]
        target_item_id: String,
    },
    #[n(4)]
    SwapAccepted,
    #[n(5)]
    SwapRejected {
        #[n(0)]
        reason: Option<String>,
    },
    #[n(6)]
    SwapCancelled,
    #[n(7)]
    PointsGranted {
        #[n(0)]
        amount: u64,
    },
    #[n(8)]
    AdminToggled {
        #[n(0)]
        is_admin: bool,
    },
}

impl AuditEvent {
    /// Moderation actions are what the admin activity report lists.
    pub fn is_moderation(&self) -> bool {
        matches!(self, AuditEvent::Moderated { .. } | AuditEvent::ItemRemoved { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuditEvent::ItemListed => "listed",
            AuditEvent::Moderated { approved: true, .. } => "approve",
            AuditEvent::Moderated { approved: false, .. } => "reject",
            AuditEvent::ItemRemoved { .. } => "remove",
            AuditEvent::SwapRequested { .. } => "swap_requested",
            AuditEvent::SwapAccepted => "swap_accepted",
            AuditEvent::SwapRejected { .. } => "swap_rejected",
            AuditEvent::SwapCancelled => "swap_cancelled",
            AuditEvent::PointsGranted { .. } => "points_granted",
            AuditEvent::AdminToggled { .. } => "admin_toggled",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AuditEvent::Moderated { reason, .. }
            | AuditEvent::ItemRemoved { reason }
            | AuditEvent::SwapRejected { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

impl AuditRecord {
    pub fn new(subject_id: &str, actor_id: &str, event: AuditEvent) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            actor_id: actor_id.to_string(),
            timestamp: TimeStamp::new(),
            event,
        }
    }

    /// The record's CBOR encoding together with its SHA-256, which is the
    /// record's key in the audit tree.
    pub fn build(&self) -> Result<(String, Vec<u8>), minicbor::encode::Error<std::convert::Infallible>> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_content_addressed() {
        let record = AuditRecord::new(
            "item_a",
            "user_admin",
            AuditEvent::Moderated {
                approved: true,
                reason: None,
            },
        );

        let (hash, cbor) = record.build().unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, sha256::digest(&cbor));

        let decoded: AuditRecord = minicbor::decode(&cbor).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.build().unwrap().0, hash);
    }

    #[test]
    fn moderation_labels() {
        let removed = AuditEvent::ItemRemoved {
            reason: Some("spam".into()),
        };
        assert!(removed.is_moderation());
        assert_eq!(removed.label(), "remove");
        assert_eq!(removed.reason(), Some("spam"));
        assert!(!AuditEvent::SwapAccepted.is_moderation());
    }
}
