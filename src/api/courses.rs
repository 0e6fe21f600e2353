//! Course API endpoints: catalog, content, Q&A, reviews and video playback.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{ApiJson, ApiPath, ApiResponse, ApiResult, MessageBody};
use crate::auth::{ensure_can_reply, ensure_course_access, AdminUser, CurrentUser};
use crate::cache::{ALL_COURSES_KEY, ALL_COURSES_TTL, COURSE_TTL, REVIEW_TTL};
use crate::db::{now, CourseEffects};
use crate::errors::{parse_id, AppError};
use crate::models::{
    is_hosted_url, AddAnswerRequest, AddQuestionRequest, AddReplyRequest, AddReviewRequest,
    Answer, ContentSection, ContentSectionInput, Course, CoursePreview, CreateCourseRequest,
    EditCourseRequest, Question, Review, ReviewReply,
};
use crate::notify::messages;
use crate::AppState;

/// Media host folder for course thumbnails.
const THUMBNAIL_FOLDER: &str = "courses";

#[derive(Debug, Serialize)]
pub struct CourseBody<T: Serialize> {
    pub course: T,
}

#[derive(Debug, Serialize)]
pub struct CoursesBody<T: Serialize> {
    pub courses: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct ContentBody {
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOtpRequest {
    pub video_id: String,
}

/// POST /create-course - Create a course (admin).
pub async fn create_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(request): ApiJson<CreateCourseRequest>,
) -> ApiResult<CourseBody<Course>> {
    require("Name", &request.name)?;
    require("Description", &request.description)?;
    validate_price(request.price)?;

    let thumbnail = match request.thumbnail.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(payload) => Some(state.media.upload(payload, THUMBNAIL_FOLDER).await?),
        None => None,
    };

    let now = now();
    let course = Course {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name,
        description: request.description,
        categories: request.categories,
        price: request.price,
        estimated_price: request.estimated_price,
        thumbnail,
        tags: request.tags,
        level: request.level,
        demo_url: request.demo_url,
        benefits: request.benefits,
        prerequisites: request.prerequisites,
        reviews: Vec::new(),
        course_data: build_sections(request.course_data, Vec::new())?,
        ratings: 0.0,
        purchased: 0,
        created_at: now.clone(),
        updated_at: now,
        version: 1,
    };

    state.repo.insert_course(&course).await?;
    state.cache.invalidate(&[ALL_COURSES_KEY]).await;

    tracing::info!(course_id = %course.id, admin = %admin.id, "Course created");
    Ok(ApiResponse::created(CourseBody { course }))
}

/// PUT /edit-course/{id} - Partially update a course (admin).
pub async fn edit_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(request): ApiJson<EditCourseRequest>,
) -> ApiResult<CourseBody<Course>> {
    let id = parse_id(&raw_id, "id")?;
    state.cache.invalidate(&[id.as_str(), ALL_COURSES_KEY]).await;

    let mut course = find_course(&state, &id).await?;

    if let Some(name) = request.name {
        require("Name", &name)?;
        course.name = name;
    }
    if let Some(description) = request.description {
        require("Description", &description)?;
        course.description = description;
    }
    if let Some(price) = request.price {
        validate_price(price)?;
        course.price = price;
    }
    if request.categories.is_some() {
        course.categories = request.categories;
    }
    if request.estimated_price.is_some() {
        course.estimated_price = request.estimated_price;
    }
    if let Some(tags) = request.tags {
        course.tags = tags;
    }
    if let Some(level) = request.level {
        course.level = level;
    }
    if let Some(demo_url) = request.demo_url {
        course.demo_url = demo_url;
    }
    if let Some(benefits) = request.benefits {
        course.benefits = benefits;
    }
    if let Some(prerequisites) = request.prerequisites {
        course.prerequisites = prerequisites;
    }
    if let Some(sections) = request.course_data {
        let existing = std::mem::take(&mut course.course_data);
        course.course_data = build_sections(sections, existing)?;
    }

    // Every field is validated before any hosted asset changes.
    if let Some(payload) = request.thumbnail.as_deref().filter(|t| !t.trim().is_empty()) {
        if !is_hosted_url(payload) {
            if let Some(old) = &course.thumbnail {
                state.media.destroy(&old.public_id).await?;
            }
            course.thumbnail = Some(state.media.upload(payload, THUMBNAIL_FOLDER).await?);
        }
    }

    let course = state.repo.save_course(&course, CourseEffects::default()).await?;

    tracing::info!(course_id = %course.id, admin = %admin.id, "Course updated");
    Ok(ApiResponse::created(CourseBody { course }))
}

/// GET /get-course/{id} - Public course preview, cache first.
pub async fn get_single_course(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<CourseBody<CoursePreview>> {
    let id = parse_id(&raw_id, "id")?;
    let repo = &state.repo;

    let fetched = state
        .cache
        .fetch(&id, COURSE_TTL, || async {
            repo.get_course(&id)
                .await
                .map(|course| course.as_ref().map(CoursePreview::from))
        })
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    Ok(ApiResponse::ok(CourseBody {
        course: fetched.value,
    }))
}

/// GET /get-courses - Public previews of every course. Always refreshes the cached list.
pub async fn get_all_courses(
    State(state): State<AppState>,
) -> ApiResult<CoursesBody<CoursePreview>> {
    let courses: Vec<CoursePreview> = state
        .repo
        .list_courses()
        .await?
        .iter()
        .map(CoursePreview::from)
        .collect();

    state
        .cache
        .put(ALL_COURSES_KEY, &courses, ALL_COURSES_TTL)
        .await;

    Ok(ApiResponse::ok(CoursesBody { courses }))
}

/// GET /get-course-content/{id} - Full content sections for a purchaser.
pub async fn get_course_content(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<ContentBody> {
    let id = parse_id(&raw_id, "id")?;
    ensure_course_access(&state.repo, &user, &id).await?;

    let course = find_course(&state, &id).await?;
    Ok(ApiResponse::ok(ContentBody {
        content: course.course_data,
    }))
}

/// PUT /add-question - Ask a question in a content section.
pub async fn add_question(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<AddQuestionRequest>,
) -> ApiResult<CourseBody<Course>> {
    require("Question", &request.question)?;
    let course_id = parse_id(&request.course_id, "courseId")?;

    let mut course = find_course(&state, &course_id).await?;
    let section = course
        .section_mut(&request.content_id)
        .ok_or_else(|| AppError::BadRequest("Invalid content id".to_string()))?;

    section.questions.push(Question {
        id: uuid::Uuid::new_v4().to_string(),
        user: user.author(),
        question: request.question,
        question_replies: Vec::new(),
        created_at: now(),
    });
    let notification = messages::question_asked(&user.id, &section.title);

    let course = state
        .repo
        .save_course(
            &course,
            CourseEffects {
                notification: Some(notification.clone()),
                email: None,
            },
        )
        .await?;
    state.hub.publish_notification(&notification);

    Ok(ApiResponse::ok(CourseBody { course }))
}

/// PUT /add-answer - Answer a question. The asker is notified, by email unless they answered
/// themselves.
pub async fn add_answer(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<AddAnswerRequest>,
) -> ApiResult<CourseBody<Course>> {
    require("Answer", &request.answer)?;
    let course_id = parse_id(&request.course_id, "courseId")?;

    let mut course = find_course(&state, &course_id).await?;
    let section = course
        .section_mut(&request.content_id)
        .ok_or_else(|| AppError::BadRequest("Invalid content id".to_string()))?;
    let section_title = section.title.clone();

    let question = section
        .questions
        .iter_mut()
        .find(|q| q.id == request.question_id)
        .ok_or_else(|| AppError::BadRequest("Invalid question id".to_string()))?;

    let timestamp = now();
    question.question_replies.push(Answer {
        id: uuid::Uuid::new_v4().to_string(),
        user: user.author(),
        answer: request.answer,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    });
    let asker_id = question.user.id.clone();

    let mut effects = CourseEffects::default();
    if asker_id == user.id {
        effects.notification = Some(messages::question_answered(&user.id, &section_title));
    } else {
        match state.repo.get_user(&asker_id).await? {
            Some(asker) => {
                effects.email = Some(state.mail.question_reply(
                    &asker.email,
                    &asker.name,
                    &section_title,
                )?);
            }
            None => {
                tracing::warn!(asker = %asker_id, "Question author unknown, reply email skipped");
            }
        }
    }

    let notification = effects.notification.clone();
    let course = state.repo.save_course(&course, effects).await?;
    if let Some(notification) = notification {
        state.hub.publish_notification(&notification);
    }

    Ok(ApiResponse::ok(CourseBody { course }))
}

/// PUT /add-review/{id} - Review a purchased course.
pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(request): ApiJson<AddReviewRequest>,
) -> ApiResult<CourseBody<Course>> {
    let course_id = parse_id(&raw_id, "id")?;
    ensure_course_access(&state.repo, &user, &course_id).await?;
    require("Review", &request.review)?;
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let mut course = find_course(&state, &course_id).await?;
    course.reviews.push(Review {
        id: uuid::Uuid::new_v4().to_string(),
        user: user.author(),
        comment: request.review,
        rating: request.rating,
        comment_replies: Vec::new(),
        created_at: now(),
    });
    course.recompute_ratings();

    let notification = messages::review_added(&user.id, &user.name, &course.name);
    let course = state
        .repo
        .save_course(
            &course,
            CourseEffects {
                notification: Some(notification.clone()),
                email: None,
            },
        )
        .await?;

    state
        .cache
        .put(&course.id, &CoursePreview::from(&course), REVIEW_TTL)
        .await;
    state.cache.invalidate(&[ALL_COURSES_KEY]).await;
    state.hub.publish_notification(&notification);

    Ok(ApiResponse::ok(CourseBody { course }))
}

/// PUT /add-reply/{id} - Reply to a review of the course.
pub async fn add_reply_to_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(request): ApiJson<AddReplyRequest>,
) -> ApiResult<CourseBody<Course>> {
    let course_id = parse_id(&raw_id, "id")?;
    ensure_can_reply(&state.repo, &user, &course_id).await?;
    require("Comment", &request.comment)?;

    let mut course = find_course(&state, &course_id).await?;
    let review = course
        .review_mut(&request.review_id)
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    let timestamp = now();
    review.comment_replies.push(ReviewReply {
        id: uuid::Uuid::new_v4().to_string(),
        user: user.author(),
        comment: request.comment,
        created_at: timestamp.clone(),
        updated_at: timestamp,
    });

    let course = state
        .repo
        .save_course(&course, CourseEffects::default())
        .await?;

    state
        .cache
        .put(&course.id, &CoursePreview::from(&course), REVIEW_TTL)
        .await;
    state.cache.invalidate(&[ALL_COURSES_KEY]).await;

    Ok(ApiResponse::ok(CourseBody { course }))
}

/// GET /get-admin-courses - Every course with full content, newest first (admin).
pub async fn get_admin_courses(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<CoursesBody<Course>> {
    let courses = state.repo.list_courses_newest_first().await?;
    Ok(ApiResponse::created(CoursesBody { courses }))
}

/// DELETE /delete-course/{id} - Delete a course (admin).
pub async fn delete_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(raw_id): ApiPath<String>,
) -> ApiResult<MessageBody> {
    let id = parse_id(&raw_id, "id")?;
    state.cache.invalidate(&[id.as_str(), ALL_COURSES_KEY]).await;

    if !state.repo.delete_course(&id).await? {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    tracing::info!(course_id = %id, admin = %admin.id, "Course deleted");
    Ok(ApiResponse::ok(MessageBody::new(
        "Course deleted successfully",
    )))
}

/// POST /getVdoCipherOTP - Playback credentials for a protected video, passed through verbatim.
pub async fn generate_video_url(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VideoOtpRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let video_id = request.video_id.trim();
    if video_id.is_empty() || !video_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest("Invalid video id".to_string()));
    }

    let otp = state
        .video
        .otp(video_id)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(otp))
}

// ==================== HELPERS ====================

async fn find_course(state: &AppState, id: &str) -> Result<Course, AppError> {
    state
        .repo
        .get_course(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "Price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// Turn submitted sections into stored ones. A section whose id matches one in `existing` keeps
/// that id and its questions; every other section gets a fresh id.
fn build_sections(
    inputs: Vec<ContentSectionInput>,
    mut existing: Vec<ContentSection>,
) -> Result<Vec<ContentSection>, AppError> {
    inputs
        .into_iter()
        .map(|input| {
            require("Content section title", &input.title)?;

            let previous = input
                .id
                .as_deref()
                .and_then(|id| existing.iter().position(|s| s.id == id))
                .map(|index| existing.swap_remove(index));

            let (id, questions) = match previous {
                Some(section) => (section.id, section.questions),
                None => (uuid::Uuid::new_v4().to_string(), Vec::new()),
            };

            Ok(ContentSection {
                id,
                title: input.title,
                description: input.description,
                video_url: input.video_url,
                video_section: input.video_section,
                video_length: input.video_length,
                video_player: input.video_player,
                links: input.links,
                suggestion: input.suggestion,
                questions,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorRef;

    fn input(id: Option<&str>, title: &str) -> ContentSectionInput {
        ContentSectionInput {
            id: id.map(str::to_string),
            title: title.to_string(),
            description: String::new(),
            video_url: String::new(),
            video_section: String::new(),
            video_length: 0.0,
            video_player: String::new(),
            links: Vec::new(),
            suggestion: String::new(),
        }
    }

    #[test]
    fn test_build_sections_keeps_questions_of_matching_ids() {
        let mut existing = build_sections(vec![input(None, "Intro")], Vec::new()).unwrap();
        existing[0].questions.push(Question {
            id: "q1".to_string(),
            user: AuthorRef {
                id: "u1".to_string(),
                name: "Ann".to_string(),
            },
            question: "Why?".to_string(),
            question_replies: Vec::new(),
            created_at: now(),
        });
        let intro_id = existing[0].id.clone();

        let rebuilt = build_sections(
            vec![
                input(Some(&intro_id), "Introduction"),
                input(Some("unknown"), "Next"),
            ],
            existing,
        )
        .unwrap();

        assert_eq!(rebuilt[0].id, intro_id);
        assert_eq!(rebuilt[0].title, "Introduction");
        assert_eq!(rebuilt[0].questions.len(), 1);
        assert_ne!(rebuilt[1].id, "unknown");
        assert!(rebuilt[1].questions.is_empty());
    }

    #[test]
    fn test_build_sections_requires_titles() {
        let err = build_sections(vec![input(None, " ")], Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
