use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ManagerCommandArgs {
    #[validate(length(min = 1, max = 32))]
    pub manager_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageArgs {
    #[validate(length(min = 1, max = 32))]
    pub chat_id: String,
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FileCommandArgs {
    #[validate(length(min = 1, max = 255))]
    pub relative_path: String,
}
