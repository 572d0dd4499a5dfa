//! HTTP 请求处理器
//!
//! 按业务域拆分：员工端（auth/profile/action_log/team/challenge/
//! badge/level/reward/content）与管理端（action/approval/employee_admin/
//! system_user/system_role/operation_log/analytics）

pub mod action;
pub mod action_log;
pub mod analytics;
pub mod approval;
pub mod auth;
pub mod badge;
pub mod challenge;
pub mod content;
pub mod employee_admin;
pub mod employee_auth;
pub mod level;
pub mod operation_log;
pub mod profile;
pub mod reward;
pub mod system_role;
pub mod system_user;
pub mod team;
