//! Database repository for CRUD operations.
//!
//! Writes that carry side effects (notifications, queued emails, ownership links) run in a
//! single transaction so the store never holds half of a domain action.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{now, timestamp};
use crate::errors::AppError;
use crate::mail::EmailMessage;
use crate::models::{Course, Layout, LayoutKind, Notification, NotificationStatus, Order, Role, User};

/// Side effects committed together with a course write.
#[derive(Debug, Default)]
pub struct CourseEffects {
    pub notification: Option<Notification>,
    pub email: Option<EmailMessage>,
}

/// Everything a purchase writes.
#[derive(Debug)]
pub struct NewPurchase<'a> {
    pub user_id: &'a str,
    pub course_id: &'a str,
    pub payment_info: Option<serde_json::Value>,
    pub notification: &'a Notification,
    pub email: Option<&'a EmailMessage>,
}

/// Email waiting in the outbox.
#[derive(Debug, Clone)]
pub struct OutboxEmail {
    pub id: String,
    pub message: EmailMessage,
    pub attempts: i64,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Get a user with their purchased courses.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, name, email, role, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let courses = sqlx::query(
            "SELECT course_id FROM user_courses WHERE user_id = ? ORDER BY purchased_at, rowid",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| r.get::<String, _>("course_id"))
        .collect();

        Ok(Some(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: Role::parse(row.get::<&str, _>("role")),
            courses,
            created_at: row.get("created_at"),
        }))
    }

    /// Record a user seen for the first time. An existing record is left untouched.
    pub async fn ensure_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        role: Role,
    ) -> Result<User, AppError> {
        sqlx::query(
            "INSERT OR IGNORE INTO users (id, name, email, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .bind(now())
        .execute(&self.pool)
        .await?;

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))
    }

    /// Whether the user has purchased the course.
    pub async fn user_owns_course(&self, user_id: &str, course_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM user_courses WHERE user_id = ? AND course_id = ?")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ==================== COURSE OPERATIONS ====================

    /// Insert a new course document.
    pub async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        let document = serde_json::to_string(course)?;
        sqlx::query(
            "INSERT INTO courses (id, document, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&course.id)
        .bind(&document)
        .bind(&course.created_at)
        .bind(&course.updated_at)
        .bind(course.version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a course by ID.
    pub async fn get_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        let row = sqlx::query("SELECT document, version FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(course_from_row).transpose()
    }

    /// List all courses in creation order.
    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let rows = sqlx::query("SELECT document, version FROM courses ORDER BY created_at, rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(course_from_row).collect()
    }

    /// List all courses, newest first.
    pub async fn list_courses_newest_first(&self) -> Result<Vec<Course>, AppError> {
        let rows = sqlx::query(
            "SELECT document, version FROM courses ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(course_from_row).collect()
    }

    /// Write back a modified course with optimistic concurrency control, committing its side
    /// effects in the same transaction. Returns the stored course with its new version.
    pub async fn save_course(
        &self,
        course: &Course,
        effects: CourseEffects,
    ) -> Result<Course, AppError> {
        let mut updated = course.clone();
        updated.updated_at = now();
        updated.version = course.version + 1;
        let document = serde_json::to_string(&updated)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE courses SET document = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&document)
        .bind(&updated.updated_at)
        .bind(updated.version)
        .bind(&course.id)
        .bind(course.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            drop(tx);
            return Err(match self.get_course(&course.id).await? {
                Some(_) => AppError::Conflict(
                    "Course was modified concurrently, please retry".to_string(),
                ),
                None => AppError::NotFound("Course not found".to_string()),
            });
        }

        if let Some(notification) = &effects.notification {
            insert_notification_on(&mut tx, notification).await?;
        }
        if let Some(email) = &effects.email {
            enqueue_email_on(&mut tx, email).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a course. Returns whether it existed.
    pub async fn delete_course(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== ORDER OPERATIONS ====================

    /// Record a purchase: ownership link, purchase counter, notification, confirmation email and
    /// the order itself, all or nothing.
    pub async fn complete_purchase(&self, purchase: NewPurchase<'_>) -> Result<Order, AppError> {
        let now = now();
        let order = Order {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: purchase.course_id.to_string(),
            user_id: purchase.user_id.to_string(),
            payment_info: purchase.payment_info,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let mut tx = self.pool.begin().await?;

        let linked = sqlx::query(
            "INSERT INTO user_courses (user_id, course_id, purchased_at) VALUES (?, ?, ?)",
        )
        .bind(purchase.user_id)
        .bind(purchase.course_id)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        match linked {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::BadRequest(
                    "You have already purchased this course".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        let counted = sqlx::query(
            r#"UPDATE courses
               SET document = json_set(document, '$.purchased',
                                       COALESCE(json_extract(document, '$.purchased'), 0) + 1),
                   version = version + 1,
                   updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&now)
        .bind(purchase.course_id)
        .execute(&mut *tx)
        .await?;

        if counted.rows_affected() == 0 {
            return Err(AppError::NotFound("Course not found".to_string()));
        }

        insert_notification_on(&mut tx, purchase.notification).await?;
        if let Some(email) = purchase.email {
            enqueue_email_on(&mut tx, email).await?;
        }

        let payment_json = order
            .payment_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO orders (id, course_id, user_id, payment_info, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&order.course_id)
        .bind(&order.user_id)
        .bind(&payment_json)
        .bind(&order.created_at)
        .bind(&order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// List all orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query(
            "SELECT id, course_id, user_id, payment_info, created_at, updated_at FROM orders ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    // ==================== NOTIFICATION OPERATIONS ====================

    /// Insert a notification outside any other write.
    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_notification_on(&mut conn, notification).await
    }

    /// List all notifications, newest first.
    pub async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, message, status, created_at, updated_at FROM notifications ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    /// Mark a notification read. Returns whether it exists; an already-read one is left as is.
    pub async fn mark_notification_read(&self, id: &str) -> Result<bool, AppError> {
        let exists = sqlx::query("SELECT 1 FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if !exists {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE notifications SET status = 'read', updated_at = ? WHERE id = ? AND status = 'unread'",
        )
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    /// Delete read notifications created before `cutoff`. Returns the number removed.
    pub async fn delete_read_notifications_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE status = 'read' AND created_at < ?")
                .bind(timestamp(cutoff))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    // ==================== LAYOUT OPERATIONS ====================

    /// Get the layout document of a kind.
    pub async fn get_layout(&self, kind: LayoutKind) -> Result<Option<Layout>, AppError> {
        let row = sqlx::query("SELECT document FROM layouts WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| serde_json::from_str(r.get::<&str, _>("document")))
            .transpose()
            .map_err(AppError::from)
    }

    /// Insert a layout. A second document of the same kind violates the unique kind column.
    pub async fn insert_layout(&self, layout: &Layout) -> Result<(), AppError> {
        let document = serde_json::to_string(layout)?;
        sqlx::query(
            "INSERT INTO layouts (id, kind, document, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&layout.id)
        .bind(layout.content.kind().as_str())
        .bind(&document)
        .bind(&layout.created_at)
        .bind(&layout.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrite the layout of the same kind.
    pub async fn update_layout(&self, layout: &Layout) -> Result<(), AppError> {
        let document = serde_json::to_string(layout)?;
        let result = sqlx::query("UPDATE layouts SET document = ?, updated_at = ? WHERE kind = ?")
            .bind(&document)
            .bind(&layout.updated_at)
            .bind(layout.content.kind().as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "{} layout not found",
                layout.content.kind().as_str()
            )));
        }
        Ok(())
    }

    // ==================== OUTBOX OPERATIONS ====================

    /// Unsent emails that have failed fewer than `max_attempts` times, oldest first.
    pub async fn pending_emails(
        &self,
        max_attempts: i64,
        limit: i64,
    ) -> Result<Vec<OutboxEmail>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, recipient, subject, html_body, text_body, attempts
               FROM email_outbox
               WHERE sent_at IS NULL AND attempts < ?
               ORDER BY created_at, rowid
               LIMIT ?"#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| OutboxEmail {
                id: row.get("id"),
                message: EmailMessage {
                    to: row.get("recipient"),
                    subject: row.get("subject"),
                    html_body: row.get("html_body"),
                    text_body: row.get("text_body"),
                },
                attempts: row.get("attempts"),
            })
            .collect())
    }

    pub async fn mark_email_sent(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE email_outbox SET sent_at = ? WHERE id = ?")
            .bind(now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_email_failed(&self, id: &str, error: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE email_outbox SET attempts = attempts + 1, last_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ==================== TRANSACTION HELPERS ====================

async fn insert_notification_on(
    conn: &mut SqliteConnection,
    notification: &Notification,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO notifications (id, user_id, title, message, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.status.as_str())
    .bind(&notification.created_at)
    .bind(&notification.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn enqueue_email_on(conn: &mut SqliteConnection, email: &EmailMessage) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO email_outbox (id, recipient, subject, html_body, text_body, attempts, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&email.to)
    .bind(&email.subject)
    .bind(&email.html_body)
    .bind(&email.text_body)
    .bind(now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ==================== ROW CONVERSION HELPERS ====================

fn course_from_row(row: &SqliteRow) -> Result<Course, AppError> {
    let mut course: Course = serde_json::from_str(row.get::<&str, _>("document"))?;
    course.version = row.get("version");
    Ok(course)
}

fn order_from_row(row: &SqliteRow) -> Result<Order, AppError> {
    let payment_info = row
        .get::<Option<String>, _>("payment_info")
        .map(|s| serde_json::from_str(&s))
        .transpose()?;

    Ok(Order {
        id: row.get("id"),
        course_id: row.get("course_id"),
        user_id: row.get("user_id"),
        payment_info,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn notification_from_row(row: &SqliteRow) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        message: row.get("message"),
        status: NotificationStatus::parse(row.get::<&str, _>("status"))
            .unwrap_or(NotificationStatus::Unread),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
