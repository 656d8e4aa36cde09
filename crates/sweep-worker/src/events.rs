use std::fmt;
use std::time::Duration;

use crate::sweep::{DialogOutcome, SweepReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Mute,
    Delete,
    Leave,
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SweepKind::Mute => "mute channels",
            SweepKind::Delete => "delete inactive chats",
            SweepKind::Leave => "leave inactive channels and groups",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub enum SweepEvent {
    Started {
        kind: SweepKind,
        account: String,
        total: usize,
    },
    Progress {
        kind: SweepKind,
        current: usize,
        total: usize,
        dialog: String,
        outcome: DialogOutcome,
    },
    RateLimited {
        kind: SweepKind,
        operation: &'static str,
        wait: Duration,
    },
    Completed {
        account: String,
        report: SweepReport,
    },
}
