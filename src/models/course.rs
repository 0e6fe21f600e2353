//! Course document and its embedded content, reviews and Q&A.

use serde::{Deserialize, Serialize};

use super::{AuthorRef, MediaRef};

/// Titled list entry used for benefits and prerequisites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitledEntry {
    pub title: String,
}

/// Downloadable link attached to a content section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// Reply appended to a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub user: AuthorRef,
    pub answer: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Question asked inside a content section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub user: AuthorRef,
    pub question: String,
    #[serde(default)]
    pub question_replies: Vec<Answer>,
    pub created_at: String,
}

/// Reply appended to a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReply {
    pub id: String,
    pub user: AuthorRef,
    pub comment: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Purchaser review with a 1-5 rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user: AuthorRef,
    pub comment: String,
    pub rating: u8,
    #[serde(default)]
    pub comment_replies: Vec<ReviewReply>,
    pub created_at: String,
}

/// A unit of course material. Video, links, suggestion and questions are purchaser-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    #[serde(default)]
    pub video_section: String,
    #[serde(default)]
    pub video_length: f64,
    #[serde(default)]
    pub video_player: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A purchasable course as stored in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<MediaRef>,
    pub tags: String,
    pub level: String,
    pub demo_url: String,
    #[serde(default)]
    pub benefits: Vec<TitledEntry>,
    #[serde(default)]
    pub prerequisites: Vec<TitledEntry>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub course_data: Vec<ContentSection>,
    #[serde(default)]
    pub ratings: f64,
    #[serde(default)]
    pub purchased: i64,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Course {
    /// Recompute `ratings` as the arithmetic mean of all review ratings (0 without reviews).
    pub fn recompute_ratings(&mut self) {
        self.ratings = average_rating(&self.reviews);
    }

    pub fn section_mut(&mut self, section_id: &str) -> Option<&mut ContentSection> {
        self.course_data.iter_mut().find(|s| s.id == section_id)
    }

    pub fn review_mut(&mut self, review_id: &str) -> Option<&mut Review> {
        self.reviews.iter_mut().find(|r| r.id == review_id)
    }
}

pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
    total / reviews.len() as f64
}

/// Content section without the purchaser-only fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPreview {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_section: String,
    pub video_length: f64,
    pub video_player: String,
}

impl From<&ContentSection> for SectionPreview {
    fn from(section: &ContentSection) -> Self {
        Self {
            id: section.id.clone(),
            title: section.title.clone(),
            description: section.description.clone(),
            video_section: section.video_section.clone(),
            video_length: section.video_length,
            video_player: section.video_player.clone(),
        }
    }
}

/// Public projection of a course, served to anyone and held in the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePreview {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<MediaRef>,
    pub tags: String,
    pub level: String,
    pub demo_url: String,
    pub benefits: Vec<TitledEntry>,
    pub prerequisites: Vec<TitledEntry>,
    pub reviews: Vec<Review>,
    pub course_data: Vec<SectionPreview>,
    pub ratings: f64,
    pub purchased: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Course> for CoursePreview {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
            description: course.description.clone(),
            categories: course.categories.clone(),
            price: course.price,
            estimated_price: course.estimated_price,
            thumbnail: course.thumbnail.clone(),
            tags: course.tags.clone(),
            level: course.level.clone(),
            demo_url: course.demo_url.clone(),
            benefits: course.benefits.clone(),
            prerequisites: course.prerequisites.clone(),
            reviews: course.reviews.clone(),
            course_data: course.course_data.iter().map(SectionPreview::from).collect(),
            ratings: course.ratings,
            purchased: course.purchased,
            created_at: course.created_at.clone(),
            updated_at: course.updated_at.clone(),
        }
    }
}

/// Content section as submitted by an admin. A known `id` keeps that section's questions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSectionInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub video_section: String,
    #[serde(default)]
    pub video_length: f64,
    #[serde(default)]
    pub video_player: String,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub suggestion: String,
}

/// Request body for creating a new course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub categories: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub estimated_price: Option<f64>,
    /// Image payload (data URI or remote URL) to upload to the media host
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub demo_url: String,
    #[serde(default)]
    pub benefits: Vec<TitledEntry>,
    #[serde(default)]
    pub prerequisites: Vec<TitledEntry>,
    #[serde(default)]
    pub course_data: Vec<ContentSectionInput>,
}

/// Request body for a partial course update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCourseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub estimated_price: Option<f64>,
    /// A URL keeps the current thumbnail; any other payload replaces it
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub benefits: Option<Vec<TitledEntry>>,
    #[serde(default)]
    pub prerequisites: Option<Vec<TitledEntry>>,
    #[serde(default)]
    pub course_data: Option<Vec<ContentSectionInput>>,
}

/// Request body for `PUT /add-question`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddQuestionRequest {
    pub question: String,
    pub course_id: String,
    pub content_id: String,
}

/// Request body for `PUT /add-answer`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAnswerRequest {
    pub answer: String,
    pub course_id: String,
    pub content_id: String,
    pub question_id: String,
}

/// Request body for `PUT /add-review/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddReviewRequest {
    pub review: String,
    pub rating: u8,
}

/// Request body for `PUT /add-reply/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReplyRequest {
    pub comment: String,
    pub review_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8) -> Review {
        Review {
            id: uuid::Uuid::new_v4().to_string(),
            user: AuthorRef {
                id: "u".to_string(),
                name: "Reviewer".to_string(),
            },
            comment: "ok".to_string(),
            rating,
            comment_replies: Vec::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_average_rating_is_mean_of_reviews() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[review(4)]), 4.0);
        assert_eq!(average_rating(&[review(5), review(4), review(3)]), 4.0);
        assert!((average_rating(&[review(5), review(4)]) - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_preview_strips_purchaser_fields() {
        let section = ContentSection {
            id: "s1".to_string(),
            title: "Intro".to_string(),
            description: "First steps".to_string(),
            video_url: "secret-video".to_string(),
            video_section: "Basics".to_string(),
            video_length: 12.5,
            video_player: "vdocipher".to_string(),
            links: vec![Link {
                title: "Slides".to_string(),
                url: "https://example.com/slides".to_string(),
            }],
            suggestion: "Take notes".to_string(),
            questions: Vec::new(),
        };

        let json = serde_json::to_value(SectionPreview::from(&section)).unwrap();
        assert_eq!(json["title"], "Intro");
        assert_eq!(json["videoSection"], "Basics");
        assert!(json.get("videoUrl").is_none());
        assert!(json.get("links").is_none());
        assert!(json.get("suggestion").is_none());
        assert!(json.get("questions").is_none());
    }
}
