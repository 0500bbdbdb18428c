//! 종료 처리.
//!
//! 측정이나 이미지 분석 중 Ctrl+C / SIGTERM을 받으면 러너에 종료를 알린다.
//! 러너는 분석 스레드를 정리한 뒤 빠져나온다. 정리 중 신호가 한 번 더 오면 즉시 프로세스를 끝낸다.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 두 번째 신호로 강제 종료할 때의 종료 코드 (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C (SIGINT)
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl StopReason {
    /// 로그용 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::Interrupt => "Ctrl+C",
            Self::Terminate => "SIGTERM",
        }
    }
}

/// 러너가 `changed()`로 기다리는 종료 수신기
pub type StopReceiver = watch::Receiver<Option<StopReason>>;

/// 종료 요청 전파. 첫 요청의 사유만 기록한다
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<StopReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// 새 수신기
    pub fn listen(&self) -> StopReceiver {
        self.tx.subscribe()
    }

    /// 종료 요청. 처음 요청이면 `true`
    pub fn request(&self, reason: StopReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    /// 기록된 종료 사유
    pub fn reason(&self) -> Option<StopReason> {
        *self.tx.borrow()
    }

    /// OS 시그널 감시 태스크 시작
    pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.listen_signals().await {
                error!("시그널 핸들러 등록 실패: {e}");
            }
        })
    }

    async fn listen_signals(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        let (mut sigint, mut sigterm) = {
            use tokio::signal::unix::{signal, SignalKind};
            (signal(SignalKind::interrupt())?, signal(SignalKind::terminate())?)
        };

        loop {
            #[cfg(unix)]
            let reason = tokio::select! {
                _ = sigint.recv() => StopReason::Interrupt,
                _ = sigterm.recv() => StopReason::Terminate,
            };
            #[cfg(not(unix))]
            let reason = {
                tokio::signal::ctrl_c().await?;
                StopReason::Interrupt
            };

            if !self.request(reason) {
                warn!("정리 중 {} 재수신, 즉시 종료", reason.label());
                std::process::exit(FORCED_EXIT_CODE);
            }
            info!("{} 수신, 분석 정리 후 종료", reason.label());
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
