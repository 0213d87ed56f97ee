// ==========================================
// 裁切贴合可投产量核算系统 - 实时推送
// ==========================================
// 职责: 固定周期全量重算并广播给所有订阅者；首个订阅者连接时立即重算
// 状态: idle / computing，无持久状态
// 失败: 记录日志，不广播，保留上一次结果（不推送部分或空结果）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::api::workable_api::WorkableApi;
use crate::config::RuntimeSettings;
use crate::engine::orchestrator::REPORT_TIMESTAMP_FORMAT;
use crate::engine::presenter::WorkableReport;
use crate::live::error::{PublisherError, PublisherResult};

/// 核算时刻来源
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// 本地时钟
pub fn local_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

/// 广播载荷
pub type SharedReport = Arc<WorkableReport>;

// ==========================================
// 配置
// ==========================================
#[derive(Debug, Clone)]
pub struct LivePublisherConfig {
    /// 推送周期
    pub interval: Duration,
    /// 单次核算时间预算
    pub compute_timeout: Duration,
    /// 广播通道容量（慢订阅者超出后跳过旧报告）
    pub channel_capacity: usize,
}

impl Default for LivePublisherConfig {
    fn default() -> Self {
        Self::from_settings(&RuntimeSettings::default())
    }
}

impl LivePublisherConfig {
    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self {
            interval: settings.live_publish_interval,
            compute_timeout: settings.compute_timeout,
            channel_capacity: 16,
        }
    }
}

// ==========================================
// 状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherState {
    Idle,
    Computing,
}

/// 推送通道状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherStatus {
    pub running: bool,
    pub state: PublisherState,
    pub last_success_at: Option<String>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub subscribers: usize,
}

// 后台任务与 HTTP 处理共享
struct PublisherShared {
    api: Arc<WorkableApi>,
    config: LivePublisherConfig,
    clock: Clock,
    sender: broadcast::Sender<SharedReport>,
    latest: Mutex<Option<SharedReport>>,
    computing: AtomicBool,
    consecutive_failures: AtomicU32,
    last_success_at: Mutex<Option<NaiveDateTime>>,
    last_error: Mutex<Option<String>>,
    trigger: Notify,
    // 周期与按需触发串行执行
    compute_lock: tokio::sync::Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ==========================================
// LivePublisher
// ==========================================
pub struct LivePublisher {
    shared: Arc<PublisherShared>,
    cancellation_token: Mutex<CancellationToken>,
    task_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl LivePublisher {
    pub fn new(api: Arc<WorkableApi>, config: LivePublisherConfig, clock: Clock) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            shared: Arc::new(PublisherShared {
                api,
                config,
                clock,
                sender,
                latest: Mutex::new(None),
                computing: AtomicBool::new(false),
                consecutive_failures: AtomicU32::new(0),
                last_success_at: Mutex::new(None),
                last_error: Mutex::new(None),
                trigger: Notify::new(),
                compute_lock: tokio::sync::Mutex::new(()),
            }),
            cancellation_token: Mutex::new(CancellationToken::new()),
            task_handle: tokio::sync::Mutex::new(None),
        }
    }

    /// 启动后台推送循环（首个周期立即执行）
    ///
    /// # Errors
    /// 已在运行时返回 `PublisherError::AlreadyRunning`
    #[instrument(skip(self))]
    pub async fn start(&self) -> PublisherResult<()> {
        let mut slot = self.task_handle.lock().await;
        if slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return Err(PublisherError::AlreadyRunning);
        }

        // 支持 stop 后重新启动
        let cancel = CancellationToken::new();
        *lock(&self.cancellation_token) = cancel.clone();

        let shared = Arc::clone(&self.shared);
        *slot = Some(tokio::spawn(async move {
            Self::publish_loop(shared, cancel).await;
        }));

        info!(
            interval_secs = self.shared.config.interval.as_secs(),
            "实时推送已启动"
        );
        Ok(())
    }

    /// 停止后台推送循环并等待退出
    ///
    /// # Errors
    /// 未运行时返回 `PublisherError::NotRunning`
    #[instrument(skip(self))]
    pub async fn stop(&self) -> PublisherResult<()> {
        let Some(handle) = self.task_handle.lock().await.take() else {
            return Err(PublisherError::NotRunning);
        };

        lock(&self.cancellation_token).cancel();

        // 进行中的核算最多再占用一个时间预算
        let join_timeout = self.shared.config.compute_timeout + Duration::from_secs(1);
        tokio::time::timeout(join_timeout, handle)
            .await
            .map_err(|_| PublisherError::Timeout {
                millis: join_timeout.as_millis() as u64,
            })?
            .map_err(|e| PublisherError::TaskJoinFailed(e.to_string()))?;

        info!("实时推送已停止");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// 订阅推送；此前无订阅者时立即触发一次重算
    pub fn subscribe(&self) -> broadcast::Receiver<SharedReport> {
        let first = self.shared.sender.receiver_count() == 0;
        let receiver = self.shared.sender.subscribe();
        if first {
            debug!("首个订阅者连接，触发立即重算");
            self.shared.trigger.notify_one();
        }
        receiver
    }

    /// 最近一次成功广播的报告
    pub fn latest(&self) -> Option<SharedReport> {
        lock(&self.shared.latest).clone()
    }

    pub fn status(&self) -> PublisherStatus {
        let state = if self.shared.computing.load(Ordering::Acquire) {
            PublisherState::Computing
        } else {
            PublisherState::Idle
        };
        PublisherStatus {
            running: self.is_running(),
            state,
            last_success_at: (*lock(&self.shared.last_success_at))
                .map(|t| t.format(REPORT_TIMESTAMP_FORMAT).to_string()),
            consecutive_failures: self.shared.consecutive_failures.load(Ordering::Acquire),
            last_error: lock(&self.shared.last_error).clone(),
            subscribers: self.shared.sender.receiver_count(),
        }
    }

    /// 立即执行一次核算与广播（不依赖后台循环）
    pub async fn run_once(&self) -> PublisherResult<SharedReport> {
        Self::publish_once(&self.shared, "manual").await
    }

    async fn publish_loop(shared: Arc<PublisherShared>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(shared.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("推送循环已取消");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = Self::publish_once(&shared, "interval").await;
                }
                _ = shared.trigger.notified() => {
                    let _ = Self::publish_once(&shared, "subscriber").await;
                }
            }
        }
    }

    async fn publish_once(shared: &Arc<PublisherShared>, reason: &'static str) -> PublisherResult<SharedReport> {
        let _serial = shared.compute_lock.lock().await;
        shared.computing.store(true, Ordering::Release);

        let api = Arc::clone(&shared.api);
        let now = (shared.clock)();
        let budget = shared.config.compute_timeout;

        let outcome =
            tokio::time::timeout(budget, tokio::task::spawn_blocking(move || api.compute_report(now)))
                .await;

        shared.computing.store(false, Ordering::Release);

        let result = match outcome {
            Err(_) => Err(PublisherError::Timeout {
                millis: budget.as_millis() as u64,
            }),
            Ok(Err(join_err)) => Err(PublisherError::TaskJoinFailed(join_err.to_string())),
            Ok(Ok(Err(api_err))) => Err(PublisherError::Compute(api_err)),
            Ok(Ok(Ok(report))) => Ok(Arc::new(report)),
        };

        match result {
            Ok(report) => {
                *lock(&shared.latest) = Some(Arc::clone(&report));
                *lock(&shared.last_success_at) = Some(now);
                *lock(&shared.last_error) = None;
                shared.consecutive_failures.store(0, Ordering::Release);

                // 无订阅者时 send 返回 Err，不视为失败
                let delivered = shared.sender.send(Arc::clone(&report)).unwrap_or(0);
                info!(
                    reason,
                    delivered,
                    summary_rows = report.summary.len(),
                    reject_rows = report.reject.len(),
                    "可投产报告已广播"
                );
                Ok(report)
            }
            Err(e) => {
                let failures = shared.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                *lock(&shared.last_error) = Some(e.to_string());
                if failures > 1 {
                    warn!(reason, failures, error = %e, "连续核算失败，保留上一次广播");
                } else {
                    error!(reason, error = %e, "核算失败，本次不广播");
                }
                Err(e)
            }
        }
    }
}
