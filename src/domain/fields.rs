//! Field vocabulary for the feed and profile caches.
//!
//! Every cacheable field is an enum variant with a fixed wire name, so key
//! construction and value codecs are resolved at compile time. The wire names
//! are part of the cache interop contract: any component sharing the cache
//! addresses the same `"{id}_{field}"` keys.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// One of the ten independently cacheable fields of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedField {
    Content,
    CreatedAt,
    LikeCount,
    RetweetCount,
    SelfLiked,
    SelfRetweeted,
    Owner,
    FirstName,
    LastName,
    ProfilePic,
}

/// Value shape a field carries; drives parsing and defensive defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Count,
    Flag,
    Timestamp,
}

impl FeedField {
    pub const ALL: [FeedField; 10] = [
        FeedField::Content,
        FeedField::CreatedAt,
        FeedField::LikeCount,
        FeedField::RetweetCount,
        FeedField::SelfLiked,
        FeedField::SelfRetweeted,
        FeedField::Owner,
        FeedField::FirstName,
        FeedField::LastName,
        FeedField::ProfilePic,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Key suffix shared with every component reading this cache.
    pub fn wire_name(self) -> &'static str {
        match self {
            FeedField::Content => "Content",
            FeedField::CreatedAt => "CreatedAt",
            FeedField::LikeCount => "LikeCount",
            FeedField::RetweetCount => "RetweetCount",
            FeedField::SelfLiked => "SelfLiked",
            FeedField::SelfRetweeted => "SelfRetweeted",
            FeedField::Owner => "Owner",
            FeedField::FirstName => "FirstName",
            FeedField::LastName => "LastName",
            FeedField::ProfilePic => "ProfilePic",
        }
    }

    /// Self-flags are cached per viewing user; everything else is shared.
    pub fn viewer_scoped(self) -> bool {
        matches!(self, FeedField::SelfLiked | FeedField::SelfRetweeted)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            FeedField::Content
            | FeedField::Owner
            | FeedField::FirstName
            | FeedField::LastName
            | FeedField::ProfilePic => FieldKind::Text,
            FeedField::CreatedAt => FieldKind::Timestamp,
            FeedField::LikeCount | FeedField::RetweetCount => FieldKind::Count,
            FeedField::SelfLiked | FeedField::SelfRetweeted => FieldKind::Flag,
        }
    }

    /// Stable column position for index-aligned field matrices.
    pub fn position(self) -> usize {
        self as usize
    }
}

/// One of the five fields of a cached user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    FirstName,
    LastName,
    Username,
    Email,
    ProfilePic,
}

impl ProfileField {
    pub const ALL: [ProfileField; 5] = [
        ProfileField::FirstName,
        ProfileField::LastName,
        ProfileField::Username,
        ProfileField::Email,
        ProfileField::ProfilePic,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            ProfileField::FirstName => "FirstName",
            ProfileField::LastName => "LastName",
            ProfileField::Username => "Username",
            ProfileField::Email => "Email",
            ProfileField::ProfilePic => "ProfilePic",
        }
    }
}

/// A typed field value, convertible to and from the cache's string form.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Count(i64),
    Flag(bool),
    Timestamp(OffsetDateTime),
}

impl FieldValue {
    /// Cache wire encoding. Counts are decimal, flags `true`/`false`,
    /// timestamps RFC 3339.
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Text(value) => value.clone(),
            FieldValue::Count(value) => value.to_string(),
            FieldValue::Flag(value) => value.to_string(),
            // Rfc3339 formatting only fails outside years 0..=9999.
            FieldValue::Timestamp(value) => value.format(&Rfc3339).unwrap_or_default(),
        }
    }

    /// Decode a cached string for `field`; `None` when it does not parse.
    pub fn decode(field: FeedField, raw: &str) -> Option<FieldValue> {
        match field.kind() {
            FieldKind::Text => Some(FieldValue::Text(raw.to_string())),
            FieldKind::Count => raw.parse::<i64>().ok().map(FieldValue::Count),
            FieldKind::Flag => raw.parse::<bool>().ok().map(FieldValue::Flag),
            FieldKind::Timestamp => OffsetDateTime::parse(raw, &Rfc3339)
                .ok()
                .map(FieldValue::Timestamp),
        }
    }

    /// Defensive default used when neither cache nor store produced a value.
    pub fn default_for(field: FeedField) -> FieldValue {
        match field.kind() {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Count => FieldValue::Count(0),
            FieldKind::Flag => FieldValue::Flag(false),
            FieldKind::Timestamp => FieldValue::Timestamp(OffsetDateTime::now_utc()),
        }
    }
}
