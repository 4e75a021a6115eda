pub mod sidebar;
pub mod ui;
