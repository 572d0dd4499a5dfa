//! 后台 Worker
//!
//! 挑战生命周期由定时 Worker 驱动，与 HTTP 请求路径解耦

mod challenge_worker;

pub use challenge_worker::ChallengeLifecycleWorker;
