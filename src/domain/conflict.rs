use crate::domain::value_objects::RecordPayload;
use crate::shared::config::ConflictPolicyKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// ローカル版とリモート版の比較結果。
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAssessment {
    /// リモートは前回同期から動いていない。ローカルの保留編集をそのまま進める。
    ProceedLocal,
    /// ローカルに保留編集がない。リモートを丸ごと採用する。
    AdoptRemote,
    /// 双方が動いた。解決ポリシーに委ねる。
    Conflict(ConflictPair),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPair {
    pub local: RecordPayload,
    pub local_updated_at: DateTime<Utc>,
    pub remote: RecordPayload,
    pub remote_updated_at: DateTime<Utc>,
}

/// 競合の解決内容。`Merge` の結果は新しいローカル編集として扱われる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "choice")]
pub enum Resolution {
    KeepLocal,
    KeepServer,
    Merge { payload: RecordPayload },
}

/// 純粋な競合判定。時刻とペイロードだけから決まり、副作用を持たない。
pub fn assess(
    local_payload: &RecordPayload,
    local_updated_at: DateTime<Utc>,
    last_synced_at: Option<DateTime<Utc>>,
    remote_payload: &RecordPayload,
    remote_updated_at: DateTime<Utc>,
) -> ConflictAssessment {
    if let Some(last) = last_synced_at {
        if remote_updated_at <= last {
            return ConflictAssessment::ProceedLocal;
        }
    }

    let has_pending_edit = match last_synced_at {
        Some(last) => local_updated_at > last,
        None => true,
    };
    if !has_pending_edit {
        return ConflictAssessment::AdoptRemote;
    }

    ConflictAssessment::Conflict(ConflictPair {
        local: local_payload.clone(),
        local_updated_at,
        remote: remote_payload.clone(),
        remote_updated_at,
    })
}

/// 差し替え可能な競合解決ポリシー。`None` は手動解決のための表面化を意味する。
pub trait ConflictPolicy: Send + Sync {
    fn resolve(&self, conflict: &ConflictPair) -> Option<Resolution>;
    fn name(&self) -> &'static str;
}

/// 既定値。自動では何も選ばず、競合をそのまま利用者へ出す。
pub struct ManualPolicy;

impl ConflictPolicy for ManualPolicy {
    fn resolve(&self, _conflict: &ConflictPair) -> Option<Resolution> {
        None
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

/// タイムスタンプの新しい側が勝つ。同時刻はローカル優先。
pub struct LastWriterWinsPolicy;

impl ConflictPolicy for LastWriterWinsPolicy {
    fn resolve(&self, conflict: &ConflictPair) -> Option<Resolution> {
        if conflict.local_updated_at >= conflict.remote_updated_at {
            Some(Resolution::KeepLocal)
        } else {
            Some(Resolution::KeepServer)
        }
    }

    fn name(&self) -> &'static str {
        "last_writer_wins"
    }
}

pub fn policy_for(kind: ConflictPolicyKind) -> Arc<dyn ConflictPolicy> {
    match kind {
        ConflictPolicyKind::Manual => Arc::new(ManualPolicy),
        ConflictPolicyKind::LastWriterWins => Arc::new(LastWriterWinsPolicy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + offset_secs, 0).unwrap()
    }

    fn payload(title: &str) -> RecordPayload {
        RecordPayload::inspection(title)
    }

    #[test]
    fn remote_unchanged_proceeds_local() {
        let assessment = assess(
            &payload("local"),
            ts(100),
            Some(ts(50)),
            &payload("remote"),
            ts(40),
        );
        assert_eq!(assessment, ConflictAssessment::ProceedLocal);
    }

    #[test]
    fn no_pending_edit_adopts_remote() {
        let assessment = assess(
            &payload("local"),
            ts(30),
            Some(ts(50)),
            &payload("remote"),
            ts(80),
        );
        assert_eq!(assessment, ConflictAssessment::AdoptRemote);
    }

    #[test]
    fn both_changed_yields_conflict() {
        let assessment = assess(
            &payload("local"),
            ts(90),
            Some(ts(50)),
            &payload("remote"),
            ts(80),
        );
        match assessment {
            ConflictAssessment::Conflict(pair) => {
                assert_eq!(pair.local, payload("local"));
                assert_eq!(pair.remote, payload("remote"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn never_synced_with_remote_copy_is_conflict() {
        let assessment = assess(&payload("local"), ts(10), None, &payload("remote"), ts(20));
        assert!(matches!(assessment, ConflictAssessment::Conflict(_)));
    }

    #[test]
    fn manual_policy_surfaces() {
        let pair = ConflictPair {
            local: payload("local"),
            local_updated_at: ts(90),
            remote: payload("remote"),
            remote_updated_at: ts(80),
        };
        assert_eq!(ManualPolicy.resolve(&pair), None);
    }

    #[test]
    fn lww_picks_newer_side() {
        let mut pair = ConflictPair {
            local: payload("local"),
            local_updated_at: ts(90),
            remote: payload("remote"),
            remote_updated_at: ts(80),
        };
        assert_eq!(
            LastWriterWinsPolicy.resolve(&pair),
            Some(Resolution::KeepLocal)
        );

        pair.remote_updated_at = pair.local_updated_at + Duration::seconds(5);
        assert_eq!(
            LastWriterWinsPolicy.resolve(&pair),
            Some(Resolution::KeepServer)
        );
    }

    #[test]
    fn lww_tie_prefers_local() {
        let pair = ConflictPair {
            local: payload("local"),
            local_updated_at: ts(80),
            remote: payload("remote"),
            remote_updated_at: ts(80),
        };
        assert_eq!(
            LastWriterWinsPolicy.resolve(&pair),
            Some(Resolution::KeepLocal)
        );
    }
}
