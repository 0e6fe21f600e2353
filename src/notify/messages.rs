//! Notification texts for domain events. Each notification is attributed to the acting user.

use chrono::Utc;

use crate::models::Notification;

pub fn question_asked(actor_id: &str, section_title: &str) -> Notification {
    Notification::new(
        Some(actor_id),
        "New Question Received",
        format!("You have a new question in {}", section_title),
        Utc::now(),
    )
}

pub fn question_answered(actor_id: &str, section_title: &str) -> Notification {
    Notification::new(
        Some(actor_id),
        "New Question Reply Received",
        format!("You have a new question reply in {}", section_title),
        Utc::now(),
    )
}

pub fn review_added(actor_id: &str, user_name: &str, course_name: &str) -> Notification {
    Notification::new(
        Some(actor_id),
        "New Review Received",
        format!("{} has given a review in {}", user_name, course_name),
        Utc::now(),
    )
}

pub fn order_placed(actor_id: &str, course_name: &str) -> Notification {
    Notification::new(
        Some(actor_id),
        "New Order",
        format!("You have a new order from {}", course_name),
        Utc::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationStatus;

    #[test]
    fn test_texts() {
        let n = review_added("u1", "Ann", "Rust for Web");
        assert_eq!(n.title, "New Review Received");
        assert_eq!(n.message, "Ann has given a review in Rust for Web");
        assert_eq!(n.user_id.as_deref(), Some("u1"));
        assert_eq!(n.status, NotificationStatus::Unread);

        assert_eq!(
            question_asked("u1", "Intro").message,
            "You have a new question in Intro"
        );
        assert_eq!(
            order_placed("u1", "Rust for Web").message,
            "You have a new order from Rust for Web"
        );
    }
}
