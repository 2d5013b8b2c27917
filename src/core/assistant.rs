//! Assistant business logic - The "AI chat" answered by pattern matching.
//!
//! Messages are classified with a handful of case-insensitive regexes and
//! answered from the user's own enrollments and the published catalogue. No
//! text leaves the server.

use crate::{
    core::{course, enrollment, user},
    entities::course as course_entity,
    errors::{Error, Result},
    integrations::email::format_amount,
};
use regex::Regex;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Longest message the assistant will read
const MAX_MESSAGE_CHARS: usize = 1000;

/// What the user is asking about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    MyCourses,
    Progress,
    Recommend,
    Pricing,
    Help,
}

/// Answer returned to the chat widget
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub intent: Intent,
    pub message: String,
    /// Follow-up prompts shown as buttons
    pub suggestions: Vec<String>,
}

// Checked in order; greetings come last so "hi, how is my progress" is a
// progress question.
#[allow(clippy::expect_used)] // good regex, it doesn't panic
static INTENT_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    [
        (
            Intent::Progress,
            r"(?i)\b(progress|how far|how much (have i|did i) (done|finished|completed)|completed?|finish(ed)?|where (was|am) i)\b",
        ),
        (
            Intent::Recommend,
            r"(?i)\b(recommend\w*|suggest\w*|what should i (learn|take|study)|next course|new course)\b",
        ),
        (
            Intent::MyCourses,
            r"(?i)(\bmy\b.*\bcourses?\b|\benrol?l(ed|ments?)\b|\bwhat am i (taking|learning|studying)\b)",
        ),
        (
            Intent::Pricing,
            r"(?i)\b(price[sd]?|pricing|costs?|how much|cheap\w*|expensive|free|pay)\b",
        ),
        (
            Intent::Greeting,
            r"(?i)^\s*(hi|hello|hey|howdy|good (morning|afternoon|evening))\b",
        ),
    ]
    .into_iter()
    .map(|(intent, pattern)| (intent, Regex::new(pattern).expect("static regex should not panic")))
    .collect()
});

/// Picks the first matching intent, falling back to [`Intent::Help`].
#[must_use]
pub fn classify(message: &str) -> Intent {
    INTENT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(message))
        .map_or(Intent::Help, |(intent, _)| *intent)
}

fn suggestions(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn price_label(c: &course_entity::Model) -> String {
    if c.price_cents == 0 {
        "free".to_string()
    } else {
        format_amount(c.price_cents, &c.currency)
    }
}

/// Answers a chat message for `user_id`.
pub async fn reply(db: &DatabaseConnection, user_id: i64, message: &str) -> Result<ChatReply> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::validation("message", "cannot be empty"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::validation(
            "message",
            format!("must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    let asker = user::get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;

    let intent = classify(message);
    tracing::debug!(user_id, ?intent, "Assistant message classified");

    let reply = match intent {
        Intent::Greeting => ChatReply {
            intent,
            message: format!(
                "Hi {}! I can list your courses, check your progress, recommend what to learn next and answer pricing questions.",
                asker.name
            ),
            suggestions: suggestions(&["Show my courses", "How is my progress?", "What should I learn next?"]),
        },
        Intent::MyCourses => my_courses(db, user_id).await?,
        Intent::Progress => progress(db, user_id).await?,
        Intent::Recommend => recommend(db, user_id).await?,
        Intent::Pricing => pricing(db).await?,
        Intent::Help => ChatReply {
            intent,
            message: "I didn't catch that. Try asking about your courses, your progress, recommendations or prices.".to_string(),
            suggestions: suggestions(&["Show my courses", "Recommend a course", "How much do courses cost?"]),
        },
    };
    Ok(reply)
}

async fn my_courses(db: &DatabaseConnection, user_id: i64) -> Result<ChatReply> {
    let enrollments = enrollment::list_enrollments_for_user(db, user_id).await?;
    let message = if enrollments.is_empty() {
        "You are not enrolled in any course yet.".to_string()
    } else {
        let listed: Vec<String> = enrollments
            .iter()
            .map(|e| format!("{} ({}%)", e.course_title, e.enrollment.progress_percent))
            .collect();
        format!(
            "You are enrolled in {} course(s): {}.",
            enrollments.len(),
            listed.join(", ")
        )
    };
    Ok(ChatReply {
        intent: Intent::MyCourses,
        message,
        suggestions: suggestions(&["How is my progress?", "What should I learn next?"]),
    })
}

async fn progress(db: &DatabaseConnection, user_id: i64) -> Result<ChatReply> {
    let enrollments = enrollment::list_enrollments_for_user(db, user_id).await?;
    if enrollments.is_empty() {
        return Ok(ChatReply {
            intent: Intent::Progress,
            message: "You have no progress to report yet. Enroll in a course to get started.".to_string(),
            suggestions: suggestions(&["Recommend a course"]),
        });
    }

    let total: i64 = enrollments.iter().map(|e| i64::from(e.enrollment.progress_percent)).sum();
    let count = i64::try_from(enrollments.len()).unwrap_or(i64::MAX);
    let average = total / count;
    let next = enrollments
        .iter()
        .filter(|e| e.enrollment.progress_percent < 100)
        .max_by_key(|e| e.enrollment.progress_percent);

    let mut message = format!(
        "Your average progress across {} course(s) is {average}%.",
        enrollments.len()
    );
    match next {
        Some(e) => message.push_str(&format!(
            " Keep going with {} ({}% done).",
            e.course_title, e.enrollment.progress_percent
        )),
        None => message.push_str(" You have completed every course you are enrolled in."),
    }
    Ok(ChatReply {
        intent: Intent::Progress,
        message,
        suggestions: suggestions(&["Show my courses", "What should I learn next?"]),
    })
}

async fn recommend(db: &DatabaseConnection, user_id: i64) -> Result<ChatReply> {
    let enrollments = enrollment::list_enrollments_for_user(db, user_id).await?;
    let enrolled: HashSet<i64> = enrollments.iter().map(|e| e.enrollment.course_id).collect();
    let categories: HashSet<i64> = enrollments.iter().filter_map(|e| e.category_id).collect();

    let candidates: Vec<course_entity::Model> = course::list_published_courses(db, None)
        .await?
        .into_iter()
        .filter(|c| !enrolled.contains(&c.id))
        .collect();
    let related: Vec<&course_entity::Model> = candidates
        .iter()
        .filter(|c| c.category_id.is_some_and(|id| categories.contains(&id)))
        .collect();
    let picks: Vec<&course_entity::Model> = if related.is_empty() {
        candidates.iter().take(3).collect()
    } else {
        related.into_iter().take(3).collect()
    };

    let message = if picks.is_empty() {
        "You're already enrolled in everything we offer right now.".to_string()
    } else {
        let listed: Vec<String> = picks
            .iter()
            .map(|c| format!("{} ({})", c.title, price_label(c)))
            .collect();
        format!("You might like: {}.", listed.join(", "))
    };
    Ok(ChatReply {
        intent: Intent::Recommend,
        message,
        suggestions: picks.iter().map(|c| format!("Tell me about {}", c.title)).collect(),
    })
}

async fn pricing(db: &DatabaseConnection) -> Result<ChatReply> {
    let courses = course::list_published_courses(db, None).await?;
    let cheapest = courses.iter().min_by_key(|c| c.price_cents);
    let priciest = courses.iter().max_by_key(|c| c.price_cents);

    let message = match (cheapest, priciest) {
        (Some(low), Some(high)) if low.id == high.id => {
            format!("{} is {}.", low.title, price_label(low))
        }
        (Some(low), Some(high)) => format!(
            "Courses range from {} ({}) to {} ({}).",
            price_label(low),
            low.title,
            price_label(high),
            high.title
        ),
        _ => "There are no courses on sale yet.".to_string(),
    };
    Ok(ChatReply {
        intent: Intent::Pricing,
        message,
        suggestions: suggestions(&["Recommend a course", "Show my courses"]),
    })
}
