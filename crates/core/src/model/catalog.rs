//! Read-only references into the catalog owned by another subsystem.
//!
//! Only the identifiers and ownership needed for joins are carried here;
//! titles, subjects and tags stay in the catalog.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ContentId, CourseId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown content kind: {0}")]
pub struct UnknownContentKind(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Book,
    Video,
    CourseItem,
}

impl ContentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Book => "book",
            ContentKind::Video => "video",
            ContentKind::CourseItem => "course-item",
        }
    }
}

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(ContentKind::Book),
            "video" => Ok(ContentKind::Video),
            // older catalog rows call embedded course material plain "course"
            "course-item" | "course" => Ok(ContentKind::CourseItem),
            other => Err(UnknownContentKind(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub id: ContentId,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub owner: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    pub id: CourseId,
    pub owner: UserId,
}

/// Position of a content item inside a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMember {
    pub course_id: CourseId,
    pub content_id: ContentId,
    pub order: u32,
}
