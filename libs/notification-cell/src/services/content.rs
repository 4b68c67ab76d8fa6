// libs/notification-cell/src/services/content.rs
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::NotificationKind;

/// Rendered (title, body) pair for one notice.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
struct Template {
    title: &'static str,
    body: &'static str,
}

/// Locale-keyed template table with `{placeholder}` substitution.
///
/// Resolution never fails: an unsupported locale falls back to the default
/// locale (logged), and placeholders without a matching param are left
/// verbatim so broken content is visible rather than silently dropped.
pub struct NotificationContentResolver {
    default_locale: String,
    templates: HashMap<&'static str, HashMap<NotificationKind, Template>>,
}

impl NotificationContentResolver {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            templates: builtin_templates(),
        }
    }

    pub fn resolve(
        &self,
        kind: NotificationKind,
        locale: &str,
        params: &[(&str, &str)],
    ) -> NoticeContent {
        let table = match self.templates.get(locale) {
            Some(table) => table,
            None => {
                warn!(
                    "No templates for locale {:?}, falling back to {:?}",
                    locale, self.default_locale
                );
                self.templates
                    .get(self.default_locale.as_str())
                    .unwrap_or_else(|| &self.templates["en"])
            }
        };

        let template = match table.get(&kind) {
            Some(template) => template,
            None => {
                warn!(
                    "No {:?} template for locale {:?}, falling back to {:?}",
                    kind, locale, self.default_locale
                );
                &self.templates["en"][&kind]
            }
        };

        debug!("Resolved {} template for locale {}", kind, locale);
        NoticeContent {
            title: substitute(template.title, params),
            body: substitute(template.body, params),
        }
    }
}

impl Default for NotificationContentResolver {
    fn default() -> Self {
        Self::new("en")
    }
}

fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in params {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

fn builtin_templates() -> HashMap<&'static str, HashMap<NotificationKind, Template>> {
    let mut en = HashMap::new();
    en.insert(
        NotificationKind::Created,
        Template {
            title: "New appointment request",
            body: "{patient} requested the {slot} slot on {date}.",
        },
    );
    en.insert(
        NotificationKind::Confirmed,
        Template {
            title: "Appointment confirmed",
            body: "Dr. {doctor} confirmed your appointment at {slot} on {date}.",
        },
    );
    en.insert(
        NotificationKind::Cancelled,
        Template {
            title: "Appointment cancelled",
            body: "The appointment at {slot} on {date} was cancelled by {actor}. Reason: {reason}",
        },
    );
    en.insert(
        NotificationKind::Completed,
        Template {
            title: "Appointment completed",
            body: "Your appointment with Dr. {doctor} on {date} is complete.",
        },
    );

    let mut zh = HashMap::new();
    zh.insert(
        NotificationKind::Created,
        Template {
            title: "新的预约请求",
            body: "{patient} 预约了 {date} {slot} 的门诊。",
        },
    );
    zh.insert(
        NotificationKind::Confirmed,
        Template {
            title: "预约已确认",
            body: "{doctor} 医生已确认您 {date} {slot} 的预约。",
        },
    );
    zh.insert(
        NotificationKind::Cancelled,
        Template {
            title: "预约已取消",
            body: "{actor} 取消了 {date} {slot} 的预约。原因:{reason}",
        },
    );
    zh.insert(
        NotificationKind::Completed,
        Template {
            title: "就诊已完成",
            body: "您与 {doctor} 医生在 {date} 的就诊已完成。",
        },
    );

    let mut templates = HashMap::new();
    templates.insert("en", en);
    templates.insert("zh", zh);
    templates
}
