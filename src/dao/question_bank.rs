use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::dao::models::{OptionFlag, QuestionEntity, QuestionId, QuestionRules};

/// Supplier of questions for new rounds.
///
/// Ingestion of raw question data (spreadsheets and the like) happens in
/// external tooling; the backend only consumes an already-curated pool.
pub trait QuestionBank: Send + Sync {
    /// Pick one question uniformly at random, `None` if the pool is empty.
    fn pick_question(&self) -> Option<QuestionEntity>;
    /// Every question in the pool, in file order.
    fn all_questions(&self) -> Vec<QuestionEntity>;
    /// Look up one question by id.
    fn question(&self, id: QuestionId) -> Option<QuestionEntity>;
}

/// Errors raised while loading a question file.
#[derive(Debug, Error)]
pub enum QuestionBankError {
    /// The file could not be read at all.
    #[error("failed to read question file `{path}`")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON of the expected shape.
    #[error("failed to parse question file `{path}`")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// [`QuestionBank`] backed by a JSON file loaded once at startup.
#[derive(Debug, Default)]
pub struct FileQuestionBank {
    questions: IndexMap<QuestionId, QuestionEntity>,
}

impl FileQuestionBank {
    /// An empty pool; the server still boots, but no game can start a round.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a bank from already-validated questions. Duplicate ids keep the
    /// last occurrence, mirroring a re-import of the same pool.
    pub fn from_questions(questions: impl IntoIterator<Item = QuestionEntity>) -> Self {
        Self {
            questions: questions
                .into_iter()
                .map(|question| (question.id, question))
                .collect(),
        }
    }

    /// Load the pool from a JSON question file.
    ///
    /// Rows are decoded individually: a malformed row is logged and skipped
    /// rather than poisoning the whole pool.
    pub fn load(path: &Path) -> Result<Self, QuestionBankError> {
        let contents = std::fs::read_to_string(path).map_err(|source| QuestionBankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawQuestionFile =
            serde_json::from_str(&contents).map_err(|source| QuestionBankError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut questions = IndexMap::new();
        for row in raw.questions {
            match serde_json::from_value::<RawQuestion>(row) {
                Ok(raw_question) => {
                    let question = QuestionEntity::from(raw_question);
                    questions.insert(question.id, question);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping malformed question row");
                }
            }
        }

        if questions.is_empty() {
            warn!(path = %path.display(), "question file yielded an empty pool");
        } else {
            info!(path = %path.display(), count = questions.len(), "loaded question pool");
        }

        Ok(Self { questions })
    }
}

impl QuestionBank for FileQuestionBank {
    fn pick_question(&self) -> Option<QuestionEntity> {
        if self.questions.is_empty() {
            return None;
        }
        let picked = rand::rng().random_range(0..self.questions.len());
        self.questions
            .get_index(picked)
            .map(|(_, question)| question.clone())
    }

    fn all_questions(&self) -> Vec<QuestionEntity> {
        self.questions.values().cloned().collect()
    }

    fn question(&self, id: QuestionId) -> Option<QuestionEntity> {
        self.questions.get(&id).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestionFile {
    #[serde(default)]
    questions: Vec<serde_json::Value>,
}

/// One question row as written in the file. Optional columns default to
/// absent here, before any validation, so a sparse row and an explicit-null
/// row construct the same entity.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: QuestionId,
    question: String,
    answer_a: String,
    answer_b: String,
    #[serde(default)]
    hotness: Option<f64>,
    #[serde(default)]
    knowledge: Option<String>,
    #[serde(default)]
    loses_all_points: Option<OptionFlag>,
    #[serde(default)]
    beheading: Option<OptionFlag>,
    #[serde(default)]
    plus_one_point: Option<OptionFlag>,
    #[serde(default)]
    invincibility: Option<OptionFlag>,
    #[serde(default)]
    jail: Option<OptionFlag>,
    #[serde(default)]
    genocide_route: Option<OptionFlag>,
    #[serde(default)]
    invincibility_or_beheading: Option<OptionFlag>,
    #[serde(default)]
    follow_up_question_id: Option<QuestionId>,
    #[serde(default)]
    follow_up_condition: Option<OptionFlag>,
}

impl From<RawQuestion> for QuestionEntity {
    fn from(raw: RawQuestion) -> Self {
        Self {
            id: raw.id,
            prompt: raw.question,
            answer_a: raw.answer_a,
            answer_b: raw.answer_b,
            hotness: raw.hotness,
            knowledge: raw.knowledge,
            rules: QuestionRules {
                loses_all_points: raw.loses_all_points,
                beheading: raw.beheading,
                plus_one_point: raw.plus_one_point,
                invincibility: raw.invincibility,
                jail: raw.jail,
                genocide_route: raw.genocide_route,
                invincibility_or_beheading: raw.invincibility_or_beheading,
            },
            follow_up_question_id: raw.follow_up_question_id,
            follow_up_condition: raw.follow_up_condition,
        }
    }
}
