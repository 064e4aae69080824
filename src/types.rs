//! Shared value types
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// `Utc` itself is not `Ord`, so a derive would never apply.
impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Wear condition of a listed item.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Condition {
    #[n(0)]
    New,
    #[n(1)]
    LikeNew,
    #[n(2)]
    Good,
    #[n(3)]
    Fair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    // accepts the labels the front-end sends as well as snake/kebab forms
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "new" => Ok(Condition::New),
            "like new" => Ok(Condition::LikeNew),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            other => Err(format!("unknown condition '{other}'")),
        }
    }
}

/// 1-based page window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

impl PageRequest {
    pub const MAX_PER_PAGE: usize = 100;

    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn apply<T>(&self, all: Vec<T>) -> Page<T> {
        let total = all.len();
        let pages = total.div_ceil(self.per_page).max(1);
        let items = all
            .into_iter()
            .skip((self.page - 1).saturating_mul(self.per_page))
            .take(self.per_page)
            .collect();

        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn timestamps_order_chronologically() {
        let earlier: TimeStamp<Utc> = DateTime::from_timestamp_nanos(1_000).into();
        let later: TimeStamp<Utc> = DateTime::from_timestamp_nanos(2_000).into();
        assert!(earlier < later);

        let mut stamps = vec![later.clone(), earlier.clone()];
        stamps.sort();
        assert_eq!(stamps, vec![earlier, later]);
    }

    #[test]
    fn condition_parses_front_end_labels() {
        assert_eq!("Like New".parse::<Condition>(), Ok(Condition::LikeNew));
        assert_eq!("like_new".parse::<Condition>(), Ok(Condition::LikeNew));
        assert_eq!("FAIR".parse::<Condition>(), Ok(Condition::Fair));
        assert!("torn".parse::<Condition>().is_err());
    }

    #[test]
    fn page_window_counts_pages() {
        let page = PageRequest::new(2, 3).apply((1..=7).collect::<Vec<_>>());
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.pages, 3);

        let empty = PageRequest::new(0, 0).apply(Vec::<u8>::new());
        assert_eq!(empty.page, 1);
        assert_eq!(empty.pages, 1);
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let page = PageRequest::new(usize::MAX, 10).apply((1..=7).collect::<Vec<_>>());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 7);
        assert_eq!(page.pages, 1);
    }
}
