pub mod agent;
pub mod conversation;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod scanner;
pub mod scene;
pub mod template;
