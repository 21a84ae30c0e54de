//! 测试工具模块
//!
//! 提供联系人测试数据生成和断言辅助。

use std::sync::atomic::{AtomicU64, Ordering};

use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use serde_json::Value;
use uuid::Uuid;

/// 生成唯一的测试邮箱
///
/// 附加 uuid 片段，保证并行测试不会撞上唯一约束
pub fn test_email() -> String {
    let email: String = SafeEmail().fake();
    let suffix = Uuid::new_v4().simple().to_string();
    match email.split_once('@') {
        Some((local, domain)) => format!("{}.{}@{}", local, &suffix[..8], domain),
        None => format!("subscriber.{}@example.com", &suffix[..8]),
    }
}

/// 生成唯一且格式合法的国际号码（+ 与 11 位数字）
///
/// 使用原子计数器确保并行测试时的唯一性
pub fn test_phone() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst) % 10_000_000;
    format!("+1555{:07}", n)
}

// ==================== 测试数据生成器 ====================

/// 联系人测试数据
#[derive(Debug, Clone)]
pub struct ContactTestData {
    pub email: String,
    pub phone: Option<String>,
    pub name: Option<String>,
}

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 只有邮箱的联系人
    pub fn email_contact() -> ContactTestData {
        ContactTestData {
            email: test_email(),
            phone: None,
            name: Some(Name().fake()),
        }
    }

    /// 只有手机号的联系人，邮箱为空串
    pub fn phone_contact() -> ContactTestData {
        ContactTestData {
            email: String::new(),
            phone: Some(test_phone()),
            name: Some(Name().fake()),
        }
    }

    /// 邮箱与手机号齐全的联系人
    pub fn full_contact() -> ContactTestData {
        ContactTestData {
            email: test_email(),
            phone: Some(test_phone()),
            name: Some(Name().fake()),
        }
    }

    /// 批量生成联系人
    pub fn contacts(count: usize) -> Vec<ContactTestData> {
        (0..count).map(|_| Self::full_contact()).collect()
    }
}

// ==================== 断言辅助 ====================

/// 测试断言辅助结构
pub struct TestAssertions;

impl TestAssertions {
    /// 断言 JSON 包含指定字段
    pub fn assert_json_has_field(value: &Value, field: &str) {
        assert!(
            value.get(field).is_some(),
            "Expected JSON to have field '{}', but it was missing. Value: {:?}",
            field,
            value
        );
    }
}
