//! 领域实体模型
//!
//! 实体结构与数据库表一一对应，枚举见 `enums` 子模块。

pub mod action;
pub mod badge;
pub mod challenge;
pub mod content;
pub mod employee;
pub mod enums;
pub mod level;

pub use action::{ActionLog, EcoAction};
pub use badge::{Badge, EmployeeBadge};
pub use challenge::{Challenge, ChallengeParticipant};
pub use content::ContentItem;
pub use employee::{Employee, Team};
pub use level::{LevelReward, RewardClaim};
