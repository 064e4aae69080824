//! Listed items: upload details, moderation status and the availability state machine
use super::error::{MarketError, MarketResult};
use super::types::{Condition, TimeStamp};
use chrono::Utc;

/// Outcome of the moderation gate. Orthogonal to [`Availability`].
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ModerationStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

/// Swap lifecycle of an item. The lock and the terminal state both name the
/// swap responsible for them.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub enum Availability {
    #[n(0)]
    Available,
    #[n(1)]
    Locked(#[n(0)] String),
    #[n(2)]
    Swapped(#[n(0)] String),
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Locked(_) => "locked",
            Availability::Swapped(_) => "swapped",
        }
    }
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

// Draft of an upload. Validated into an [`Item`] by `finalise`.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ItemDetails {
    title: Option<String>,
    description: String,
    category: Option<String>,
    item_type: Option<String>,
    condition: Option<Condition>,
    size: Option<String>,
    tags: Vec<String>,
    images: Vec<String>,
}

impl ItemDetails {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.trim().to_string());
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }
    pub fn set_category(mut self, category: &str) -> Self {
        self.category = Some(category.trim().to_string());
        self
    }
    pub fn set_type(mut self, item_type: &str) -> Self {
        self.item_type = Some(item_type.trim().to_string());
        self
    }
    pub fn set_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
    pub fn set_size(mut self, size: &str) -> Self {
        let size = size.trim();
        self.size = (!size.is_empty()).then(|| size.to_string());
        self
    }
    /// Accepts a comma separated list, the way the upload form sends it.
    pub fn set_tags(mut self, tags: &str) -> Self {
        self.tags = tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
    /// The first image added is the main image.
    pub fn add_image(mut self, reference: &str) -> Self {
        let reference = reference.trim();
        if !reference.is_empty() {
            self.images.push(reference.to_string());
        }
        self
    }

    // Checks required fields and produces a fresh item awaiting moderation.
    pub fn finalise(self, id: String, owner: String) -> MarketResult<Item> {
        let title = required("title", self.title)?;
        let category = required("category", self.category)?;
        let item_type = required("type", self.item_type)?;
        let condition = self
            .condition
            .ok_or_else(|| MarketError::Validation("condition is required".into()))?;

        Ok(Item {
            id,
            title,
            description: self.description,
            category,
            item_type,
            condition,
            size: self.size,
            tags: self.tags,
            images: self.images,
            owner,
            created_at: TimeStamp::new(),
            moderation: ModerationStatus::Pending,
            availability: Availability::Available,
            acquired_by: None,
            removed: false,
        })
    }
}

fn required(field: &str, value: Option<String>) -> MarketResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MarketError::Validation(format!("{field} is required"))),
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct Item {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub title: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub category: String,
    #[n(4)]
    pub item_type: String,
    #[n(5)]
    pub condition: Condition,
    #[n(6)]
    pub size: Option<String>,
    #[n(7)]
    pub tags: Vec<String>,
    #[n(8)]
    pub images: Vec<String>,
    #[n(9)]
    pub owner: String,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
    #[n(11)]
    pub moderation: ModerationStatus,
    #[n(12)]
    pub availability: Availability,
    #[n(13)]
    pub acquired_by: Option<String>,
    #[n(14)]
    pub removed: bool,
}

impl Item {
    pub fn main_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn is_approved(&self) -> bool {
        self.moderation == ModerationStatus::Approved
    }

    /// Visible in public browse and search.
    pub fn is_listed(&self) -> bool {
        self.is_approved() && !self.removed
    }

    /// Eligible to be the target or the offered item of a new swap.
    pub fn is_swappable(&self) -> bool {
        self.is_listed() && self.availability == Availability::Available
    }

    pub fn locked_by(&self) -> Option<&str> {
        match &self.availability {
            Availability::Locked(swap_id) => Some(swap_id),
            _ => None,
        }
    }

    /// Case-insensitive substring match over title, description and tags.
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    // MODERATION

    pub fn approve(&mut self) -> MarketResult<()> {
        self.ensure_undecided()?;
        self.moderation = ModerationStatus::Approved;
        self.availability = Availability::Available;
        Ok(())
    }

    pub fn reject(&mut self) -> MarketResult<()> {
        self.ensure_undecided()?;
        self.moderation = ModerationStatus::Rejected;
        Ok(())
    }

    fn ensure_undecided(&self) -> MarketResult<()> {
        if self.moderation != ModerationStatus::Pending {
            return Err(MarketError::InvalidState(format!(
                "item {} was already {}",
                self.id,
                self.moderation.as_str()
            )));
        }
        Ok(())
    }

    // AVAILABILITY

    /// `available -> locked`, held by `swap_id`.
    pub fn lock(&mut self, swap_id: &str) -> MarketResult<()> {
        if !self.is_swappable() {
            return Err(MarketError::ItemNotAvailable(self.id.clone()));
        }
        self.availability = Availability::Locked(swap_id.to_string());
        Ok(())
    }

    /// `locked -> available`, only by the swap holding the lock.
    pub fn release(&mut self, swap_id: &str) -> MarketResult<()> {
        self.ensure_held_by(swap_id)?;
        self.availability = Availability::Available;
        Ok(())
    }

    /// `locked -> swapped`, only by the swap holding the lock.
    pub fn complete_swap(&mut self, swap_id: &str, acquirer: &str) -> MarketResult<()> {
        self.ensure_held_by(swap_id)?;
        self.availability = Availability::Swapped(swap_id.to_string());
        self.acquired_by = Some(acquirer.to_string());
        Ok(())
    }

    /// `available -> swapped` for the offered side of a direct swap, which is
    /// never locked.
    pub fn hand_over(&mut self, swap_id: &str, acquirer: &str) -> MarketResult<()> {
        if !self.is_swappable() {
            return Err(MarketError::InvalidOfferedItem(format!(
                "item {} is no longer available",
                self.id
            )));
        }
        self.availability = Availability::Swapped(swap_id.to_string());
        self.acquired_by = Some(acquirer.to_string());
        Ok(())
    }

    fn ensure_held_by(&self, swap_id: &str) -> MarketResult<()> {
        match self.locked_by() {
            Some(holder) if holder == swap_id => Ok(()),
            _ => Err(MarketError::InvalidState(format!(
                "item {} is {} and not held by swap {}",
                self.id,
                self.availability.as_str(),
                swap_id
            ))),
        }
    }

    /// Soft delete. Refused while a pending swap holds the item.
    pub fn remove(&mut self) -> MarketResult<()> {
        if self.locked_by().is_some() {
            return Err(MarketError::ItemLocked(self.id.clone()));
        }
        self.removed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved_item() -> Item {
        let mut item = ItemDetails::new()
            .set_title("Denim jacket")
            .set_category("Outerwear")
            .set_type("Jacket")
            .set_condition(Condition::Good)
            .finalise("item_a".into(), "user_owner".into())
            .unwrap();
        item.approve().unwrap();
        item
    }

    #[test]
    fn finalise_requires_core_fields() {
        let missing_type = ItemDetails::new()
            .set_title("Scarf")
            .set_category("Accessories")
            .set_condition(Condition::New)
            .finalise("item_x".into(), "user_x".into());
        assert!(matches!(missing_type, Err(MarketError::Validation(_))));

        let blank_title = ItemDetails::new()
            .set_title("   ")
            .set_category("Accessories")
            .set_type("Scarf")
            .set_condition(Condition::New)
            .finalise("item_x".into(), "user_x".into());
        assert!(matches!(blank_title, Err(MarketError::Validation(_))));
    }

    #[test]
    fn new_items_await_moderation() {
        let item = ItemDetails::new()
            .set_title("Scarf")
            .set_category("Accessories")
            .set_type("Scarf")
            .set_condition(Condition::LikeNew)
            .set_tags("wool, winter,,")
            .add_image("static/uploads/a.png")
            .add_image("static/uploads/b.png")
            .finalise("item_x".into(), "user_x".into())
            .unwrap();

        assert_eq!(item.moderation, ModerationStatus::Pending);
        assert!(!item.is_listed());
        assert!(!item.is_swappable());
        assert_eq!(item.tags, vec!["wool", "winter"]);
        assert_eq!(item.main_image(), Some("static/uploads/a.png"));
    }

    #[test]
    fn moderation_decides_once() {
        let mut item = approved_item();
        assert!(matches!(item.approve(), Err(MarketError::InvalidState(_))));
        assert!(matches!(item.reject(), Err(MarketError::InvalidState(_))));
        assert!(item.is_approved());
    }

    #[test]
    fn lock_release_and_swap() {
        let mut item = approved_item();

        item.lock("swap_1").unwrap();
        assert_eq!(item.locked_by(), Some("swap_1"));
        assert!(matches!(item.lock("swap_2"), Err(MarketError::ItemNotAvailable(_))));
        assert!(matches!(item.release("swap_2"), Err(MarketError::InvalidState(_))));
        assert!(matches!(item.remove(), Err(MarketError::ItemLocked(_))));

        item.release("swap_1").unwrap();
        assert_eq!(item.availability, Availability::Available);

        item.lock("swap_3").unwrap();
        item.complete_swap("swap_3", "user_buyer").unwrap();
        assert_eq!(item.availability, Availability::Swapped("swap_3".into()));
        assert_eq!(item.acquired_by.as_deref(), Some("user_buyer"));

        // swapped is terminal
        assert!(item.lock("swap_4").is_err());
        assert!(item.release("swap_3").is_err());
    }

    #[test]
    fn removed_items_cannot_be_swapped() {
        let mut item = approved_item();
        item.remove().unwrap();
        assert!(!item.is_listed());
        assert!(matches!(item.lock("swap_1"), Err(MarketError::ItemNotAvailable(_))));
        assert!(matches!(
            item.hand_over("swap_1", "user_b"),
            Err(MarketError::InvalidOfferedItem(_))
        ));
    }

    #[test]
    fn cbor_roundtrip_keeps_lock_holder() {
        let mut item = approved_item();
        item.lock("swap_1").unwrap();

        let encoded = minicbor::to_vec(&item).unwrap();
        let decoded: Item = minicbor::decode(&encoded).unwrap();
        assert_eq!(decoded, item);
    }
}
