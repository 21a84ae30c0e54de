//! 通知模板引擎
//!
//! 提供模板变量替换功能，支持 `{{variable}}` 语法。
//!
//! ## 使用示例
//!
//! ```ignore
//! let engine = TemplateEngine::with_defaults();
//!
//! let mut context = TemplateContext::new();
//! context.set("name", "Ada");
//! context.set("title", "New health centre opened");
//!
//! let rendered = engine.render("Dear {{name}}, {{title}}", &context);
//! // 输出: "Dear Ada, New health centre opened"
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::types::{NotificationPayload, RenderedContent};
use crate::models::{SourceType, Subscriber};

/// 短信单条长度上限（GSM-7 字符）
pub const SHORT_TEXT_MAX_LEN: usize = 160;

// 字面量正则，不会构造失败
static VARIABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("模板变量正则非法"));

static BLANK_LINES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("空行正则非法"));

/// 模板渲染上下文
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    /// 由通知内容与订阅者构造上下文
    ///
    /// 可选字段缺失时置为空串，保证默认模板中的变量都能替换
    pub fn for_subscriber(payload: &NotificationPayload, subscriber: &Subscriber) -> Self {
        let mut context = Self::new();
        context.set("name", subscriber.display_name());
        context.set("title", payload.title.trim());
        context.set("source_type", payload.source_type.as_str());
        context.set("source_id", payload.source_id.as_str());
        context.set(
            "description",
            payload.description.as_deref().unwrap_or_default().trim(),
        );
        context.set(
            "category",
            payload.category.as_deref().unwrap_or_default().trim(),
        );
        context.set("url", payload.url.as_deref().unwrap_or_default().trim());
        context
    }
}

/// 单个来源类型的模板
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
    pub short_text: String,
}

impl MessageTemplate {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        short_text: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            short_text: short_text.into(),
        }
    }
}

/// 模板引擎
///
/// 按来源类型管理邮件主题、正文与短文本模板
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    templates: HashMap<SourceType, MessageTemplate>,
}

impl TemplateEngine {
    /// 创建空的模板引擎
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带有默认模板的引擎
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register_default_templates();
        engine
    }

    fn register_default_templates(&mut self) {
        self.register_template(
            SourceType::Achievement,
            MessageTemplate::new(
                "New achievement: {{title}}",
                "Dear {{name}},\n\n\
                 A new achievement has been published by the constituency office.\n\n\
                 {{title}}\n{{description}}\n\n{{url}}\n\n\
                 You are receiving this message because you subscribed to constituency updates.",
                "New achievement: {{title}} {{url}}",
            ),
        );

        self.register_template(
            SourceType::Broadcast,
            MessageTemplate::new(
                "Live now: {{title}}",
                "Dear {{name}},\n\n\
                 The constituency office is broadcasting now.\n\n\
                 {{title}}\n{{description}}\n\n{{url}}",
                "Live now: {{title}} {{url}}",
            ),
        );

        self.register_template(
            SourceType::SubscriberStatus,
            MessageTemplate::new(
                "Subscription update: {{title}}",
                "Dear {{name}},\n\n{{title}}\n{{description}}",
                "{{title}}",
            ),
        );
    }

    /// 注册模板，已存在时覆盖
    pub fn register_template(&mut self, source_type: SourceType, template: MessageTemplate) {
        self.templates.insert(source_type, template);
    }

    pub fn get_template(&self, source_type: SourceType) -> Option<&MessageTemplate> {
        self.templates.get(&source_type)
    }

    /// 渲染模板
    ///
    /// 将模板中的 `{{variable}}` 替换为上下文中的对应值。
    /// 未找到的变量会保留原样并记录警告日志。
    pub fn render(&self, template: &str, context: &TemplateContext) -> String {
        VARIABLE_REGEX
            .replace_all(template, |caps: &regex::Captures| {
                let var_name = &caps[1];
                match context.get(var_name) {
                    Some(value) => value.to_string(),
                    None => {
                        warn!(variable = var_name, "模板变量未找到，保留原样");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// 为订阅者渲染三种文案
    ///
    /// 来源类型没有注册模板时，直接使用标题与描述
    pub fn render_content(
        &self,
        payload: &NotificationPayload,
        subscriber: &Subscriber,
    ) -> RenderedContent {
        let context = TemplateContext::for_subscriber(payload, subscriber);

        let (subject, body, short_text) = match self.get_template(payload.source_type) {
            Some(t) => (
                self.render(&t.subject, &context),
                self.render(&t.body, &context),
                self.render(&t.short_text, &context),
            ),
            None => {
                let description = payload.description.clone().unwrap_or_default();
                (
                    payload.title.clone(),
                    format!("{}\n\n{}", payload.title, description),
                    payload.title.clone(),
                )
            }
        };

        RenderedContent {
            subject: collapse_whitespace(&subject),
            body: tidy_body(&body),
            short_text: truncate_chars(&collapse_whitespace(&short_text), SHORT_TEXT_MAX_LEN),
        }
    }

    /// 提取模板中的所有变量名
    pub fn extract_variables(&self, template: &str) -> Vec<String> {
        VARIABLE_REGEX
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

/// 去除行尾空白，连续空行压缩为一行
fn tidy_body(body: &str) -> String {
    let trimmed_lines: Vec<&str> = body.lines().map(str::trim_end).collect();
    let joined = trimmed_lines.join("\n");
    BLANK_LINES_REGEX
        .replace_all(joined.trim(), "\n\n")
        .into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按字符截断，超长时以省略号结尾
fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", truncated.trim_end())
}
