use serde::Serialize;
use std::ops::ControlFlow;

/// 审核过程中的进度事件
///
/// `position` 从 1 开始计数，`planned` 为采样集大小。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditProgress {
    FrameFetched {
        frame_index: usize,
        position: usize,
        planned: usize,
    },
    FrameScored {
        frame_index: usize,
        entropy: f32,
        position: usize,
        planned: usize,
    },
    FrameSkipped {
        frame_index: usize,
        position: usize,
        planned: usize,
    },
    StoppedEarly {
        frame_index: usize,
        frames_analyzed: usize,
    },
}

impl AuditProgress {
    /// 0.0 - 1.0 的完成比例
    pub fn fraction(&self) -> f32 {
        match *self {
            AuditProgress::FrameScored {
                position, planned, ..
            }
            | AuditProgress::FrameSkipped {
                position, planned, ..
            } if planned > 0 => position as f32 / planned as f32,
            AuditProgress::StoppedEarly { .. } => 1.0,
            _ => 0.0,
        }
    }
}

/// 进度回调。返回 `ControlFlow::Break` 取消本次审核
pub trait AuditObserver {
    fn on_progress(&mut self, event: AuditProgress) -> ControlFlow<()>;
}

/// 不关心进度
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl AuditObserver for NoProgress {
    fn on_progress(&mut self, _event: AuditProgress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F> AuditObserver for F
where
    F: FnMut(AuditProgress) -> ControlFlow<()>,
{
    fn on_progress(&mut self, event: AuditProgress) -> ControlFlow<()> {
        self(event)
    }
}
