// ==========================================
// 裁切贴合可投产量核算系统 - 实时推送层
// ==========================================
// 职责: 周期重算 + 广播，拉取端点与推送通道输出同结构
// ==========================================

pub mod error;
pub mod publisher;

pub use error::{PublisherError, PublisherResult};
pub use publisher::{
    local_clock, Clock, LivePublisher, LivePublisherConfig, PublisherState, PublisherStatus,
    SharedReport,
};
