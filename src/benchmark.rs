use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::client::{ClientConfig, Completion, OpenRouterClient};
use crate::config::{Config, API_KEY_ENV};
use crate::dispatch;
use crate::metrics::Metrics;
use crate::report::{ReportBuilder, ResultEntry};

/// A question to submit to the routing service.
///
/// Questions are loaded from a JSON file containing a flat array of records.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: u64,
    pub difficulty: String,
    pub question: String,
}

/// Outcome of one question: the completion, if any attempt succeeded.
#[derive(Debug)]
struct QuestionOutcome {
    question: Question,
    completion: Option<Completion>,
}

/// End-to-end orchestrator: loads questions, fans them out through the
/// client, assembles the report, and persists it.
pub struct BenchmarkRunner {
    client: Arc<OpenRouterClient>,
    config: Config,
    questions: Vec<Question>,
}

impl BenchmarkRunner {
    /// Builds a runner, failing fast before any network activity if the API
    /// key is absent from the environment or the question file is missing or
    /// malformed.
    pub fn new(config: Config) -> Result<Self> {
        let api_key = env::var(API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", API_KEY_ENV))?;

        let questions = Self::load_questions(&config.input.file)?;
        info!(
            "Loaded {} questions from {}",
            questions.len(),
            config.input.file.display()
        );

        if config.routing.models.len() > 1 {
            warn!(
                "Only the first configured model ({}) is used as the routing target; ignoring {:?}",
                config.routing.target(),
                &config.routing.models[1..]
            );
        }

        let client = OpenRouterClient::new(ClientConfig {
            base_url: config.endpoint.base_url.clone(),
            api_key,
            routing_target: config.routing.target().to_string(),
            timeout: Duration::from_secs(config.endpoint.timeout),
            max_retries: config.endpoint.max_retries,
            retry_initial_delay: Duration::from_secs(config.endpoint.retry_initial_delay),
        })?;

        Ok(Self {
            client: Arc::new(client),
            config,
            questions,
        })
    }

    fn load_questions(path: &Path) -> Result<Vec<Question>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("question file {} not found", path.display()))?;
        let questions: Vec<Question> = serde_json::from_str(&contents)
            .with_context(|| format!("question file {} is not a valid question list", path.display()))?;
        Ok(questions)
    }

    /// Runs every question through the bounded dispatcher, then assembles and
    /// persists the report. Individual question failures never abort the run;
    /// a report write failure is logged and the run still completes.
    pub async fn run(&self) -> Result<()> {
        let start = Instant::now();
        let mut builder = ReportBuilder::new(
            self.config.routing.models.clone(),
            self.questions.len(),
        );

        let client = Arc::clone(&self.client);
        let outcomes = dispatch::run(
            self.questions.clone(),
            self.config.load.concurrent_requests,
            move |question| {
                let client = Arc::clone(&client);
                async move { Self::process_question(client, question).await }
            },
        )
        .await;

        Self::merge_outcomes(&mut builder, outcomes);
        Self::reconcile_missing(&mut builder, &self.questions);

        let report = builder.build();

        match report.write(&self.config.output.file) {
            Ok(()) => info!(
                "Benchmark results saved to {}",
                self.config.output.file.display()
            ),
            Err(e) => error!(
                "Error saving results to {}: {}",
                self.config.output.file.display(),
                e
            ),
        }

        info!(
            "Benchmark completed in {:.1}s",
            start.elapsed().as_secs_f64()
        );
        info!(
            "Total questions processed: {}",
            report.summary.total_questions
        );
        for (model, count) in &report.summary.model_usage {
            info!("  {}: {}", model, count);
        }
        info!(
            "Retries: {}, rate limit hits: {}",
            Metrics::retries(),
            Metrics::rate_limits()
        );
        if !report.summary.failed_questions.is_empty() {
            warn!(
                "Failed to answer {} questions: {:?}",
                report.summary.failed_questions.len(),
                report.summary.failed_questions
            );
        }

        Ok(())
    }

    /// Handles one question. Never propagates an error: a missing answer is
    /// recorded in the outcome, not raised.
    async fn process_question(
        client: Arc<OpenRouterClient>,
        question: Question,
    ) -> QuestionOutcome {
        info!(
            "Processing question {} (difficulty: {})",
            question.id, question.difficulty
        );
        Metrics::record_sent();

        let completion = client.get_completion(&question.question).await;
        match &completion {
            Some(completion) => {
                Metrics::record_success();
                info!("Question {} answered by {}", question.id, completion.model);
            }
            None => {
                Metrics::record_failed();
                error!("No answer for question {}", question.id);
            }
        }

        QuestionOutcome {
            question,
            completion,
        }
    }

    fn merge_outcomes(builder: &mut ReportBuilder, outcomes: Vec<QuestionOutcome>) {
        for outcome in outcomes {
            match outcome.completion {
                Some(completion) => builder.record_success(ResultEntry {
                    id: outcome.question.id,
                    difficulty: outcome.question.difficulty,
                    question: outcome.question.question,
                    model_used: completion.model,
                    answer: completion.answer,
                }),
                None => builder.record_failure(outcome.question.id),
            }
        }
    }

    /// An aborted worker yields no outcome; its question still has to land in
    /// the failed list so every id is accounted for exactly once.
    fn reconcile_missing(builder: &mut ReportBuilder, questions: &[Question]) {
        for question in questions {
            if !builder.contains(question.id) {
                builder.record_failure(question.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64) -> Question {
        Question {
            id,
            difficulty: "medium".to_string(),
            question: format!("question {}", id),
        }
    }

    fn answered(id: u64, model: &str) -> QuestionOutcome {
        QuestionOutcome {
            question: question(id),
            completion: Some(Completion {
                model: model.to_string(),
                answer: "answer".to_string(),
            }),
        }
    }

    fn unanswered(id: u64) -> QuestionOutcome {
        QuestionOutcome {
            question: question(id),
            completion: None,
        }
    }

    #[test]
    fn parses_question_list() {
        let json = r#"[
            { "id": 1, "difficulty": "easy", "question": "What is 2+2?" },
            { "id": 2, "difficulty": "hard", "question": "Why is the sky blue?" }
        ]"#;

        let questions: Vec<Question> = serde_json::from_str(json).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[1].difficulty, "hard");
    }

    #[test]
    fn rejects_malformed_question_list() {
        let json = r#"{ "id": 1 }"#;
        assert!(serde_json::from_str::<Vec<Question>>(json).is_err());
    }

    #[test]
    fn load_questions_fails_for_missing_file() {
        let result = BenchmarkRunner::load_questions(Path::new("no-such-file.json"));
        assert!(result.is_err());
    }

    #[test]
    fn merged_report_partitions_ids_between_results_and_failures() {
        let questions = vec![question(1), question(2), question(3)];
        let mut builder = ReportBuilder::new(vec!["openrouter/auto".to_string()], questions.len());

        // Completion order differs from id order on purpose
        let outcomes = vec![answered(3, "m1"), unanswered(2), answered(1, "m1")];
        BenchmarkRunner::merge_outcomes(&mut builder, outcomes);
        BenchmarkRunner::reconcile_missing(&mut builder, &questions);

        let report = builder.build();

        let ids: Vec<u64> = report.results.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(report.results[0].model_used, "m1");
        assert_eq!(report.summary.failed_questions, vec![2]);
        assert_eq!(report.summary.model_usage.get("m1"), Some(&2));
        assert_eq!(
            report.results.len() + report.summary.failed_questions.len(),
            report.summary.total_questions
        );
    }

    #[test]
    fn reconcile_records_questions_with_no_outcome_as_failed() {
        let questions = vec![question(1), question(2)];
        let mut builder = ReportBuilder::new(vec!["openrouter/auto".to_string()], questions.len());

        // Only question 1 produced an outcome
        BenchmarkRunner::merge_outcomes(&mut builder, vec![answered(1, "m1")]);
        BenchmarkRunner::reconcile_missing(&mut builder, &questions);

        let report = builder.build();
        assert_eq!(report.summary.failed_questions, vec![2]);
        assert_eq!(report.results.len(), 1);
    }
}
