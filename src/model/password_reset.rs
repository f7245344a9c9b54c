use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub used: bool,
    pub created_at: NaiveDateTime,
}

impl PasswordResetToken {
    pub fn is_valid(&self, now: NaiveDateTime) -> bool {
        !self.used && now < self.expires_at
    }
}
