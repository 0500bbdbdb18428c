//! 진행률 보고 / 협조적 취소 포트.
//!
//! 분석기는 고정된 마일스톤마다 진행률을 보고하고, 그 직후 취소 여부를 확인한다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 진행률 보고
pub trait ProgressReporter {
    /// 진행률(0~100)과 짧은 상태 문구 보고
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressReporter for F
where
    F: Fn(u8, &str),
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// 진행률을 무시하는 보고자
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// 취소 여부 확인
pub trait CancelCheck {
    /// 취소 요청 여부
    fn is_canceled(&self) -> bool;
}

impl<F> CancelCheck for F
where
    F: Fn() -> bool,
{
    fn is_canceled(&self) -> bool {
        self()
    }
}

/// 취소되지 않음
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
    fn is_canceled(&self) -> bool {
        false
    }
}

/// 스레드 간 공유 취소 플래그
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// 새 토큰 (취소 안 됨)
    pub fn new() -> Self {
        Self::default()
    }

    /// 취소 요청
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancelCheck for CancelToken {
    fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn closure_reporter_receives_milestones() {
        let seen = RefCell::new(Vec::new());
        let reporter = |p: u8, m: &str| seen.borrow_mut().push((p, m.to_string()));
        reporter.report(15, "HSV");
        reporter.report(30, "hue");
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1].0, 30);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_canceled());
        token.cancel();
        assert!(other.is_canceled());
    }
}
