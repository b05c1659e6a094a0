//! Enumerations shared by the store, adapters, evidence engine, and API.
//!
//! Each enum round-trips through Postgres as `text` (bound/read via
//! `as_str`/`FromStr`, not a native Postgres `ENUM`, so that migrations stay
//! additive — see SPEC_FULL.md §3.1) and through JSON via serde with
//! `snake_case` variant names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $($variant:ident => $s:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        $vis enum $name { $($variant),+ }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $s),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(format!(concat!("invalid ", stringify!($name), ": {}"), other)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                s.parse::<Self>().map_err(Into::into)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SourceType {
        Rss => "rss",
        Podcast => "podcast",
        Manual => "manual",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TranscriptStatus {
        None => "none",
        Pending => "pending",
        Partial => "partial",
        Complete => "complete",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum IngestStatus {
        Pending => "pending",
        Ok => "ok",
        Failed => "failed",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SegmentStatus {
        Raw => "raw",
        Final => "final",
        Superseded => "superseded",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OffsetKind {
        Text => "text",
        Html => "html",
        Seconds => "seconds",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ReferenceType {
        Paper => "paper",
        Article => "article",
        Book => "book",
        Website => "website",
        None => "none",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Verdict {
        Confirms => "confirms",
        Refutes => "refutes",
        Nuances => "nuances",
        Irrelevant => "irrelevant",
        None => "none",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AuthoredBy {
        Human => "human",
        Agent => "agent",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum JobStatus {
        Queued => "queued",
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TranscriptionProvider {
        Openai => "openai",
        Assembly => "assembly",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FreshnessStatus {
        Stale => "stale",
        Current => "current",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AnalysisMode {
        Summary => "summary",
        FullReference => "full_reference",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SuggestionSource {
        Existing => "existing",
        Generated => "generated",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_round_trips_through_str() {
        for v in [Verdict::Confirms, Verdict::Refutes, Verdict::Nuances, Verdict::Irrelevant, Verdict::None] {
            let s = v.as_str();
            assert_eq!(Verdict::from_str(s).unwrap(), v);
        }
    }

    #[test]
    fn verdict_rejects_unknown_string() {
        assert!(Verdict::from_str("maybe").is_err());
    }

    #[test]
    fn verdict_json_is_snake_case() {
        let j = serde_json::to_string(&Verdict::Irrelevant).unwrap();
        assert_eq!(j, "\"irrelevant\"");
    }
}
