use crate::infra::LoggingChangeNotifier;
use chrono::{Local, NaiveDate};
use clap::Args;
use openconsent::config::ChartConfig;
use openconsent::decisions::{
    DecisionId, DecisionService, DecisionStatus, EditTarget, FeedbackKind, FormData,
    InMemoryDecisionRepository, RequestContext, SubmitOutcome, Username,
};
use openconsent::error::AppError;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Tallest bar in the feedback chart, in pixels
    #[arg(long)]
    pub(crate) max_height: Option<u32>,
    /// Date to stamp the sample decision with (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

const SAMPLE_FEEDBACK: [(&str, &str); 5] = [
    ("Who buys the food?", "0"),
    ("The dog is allergic to chicken", "1"),
    ("Twice a day seems a lot", "2"),
    ("Fine by me", "3"),
    ("Happy to take mornings", "3"),
];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let chart = args
        .max_height
        .map(|max_height| ChartConfig { max_height })
        .unwrap_or_default();
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let service = DecisionService::new(
        Arc::new(InMemoryDecisionRepository::new()),
        Arc::new(LoggingChangeNotifier),
    )
    .with_chart(chart);
    let ctx = RequestContext::new(Username::new("demo"), today);

    let id = match service.submit(
        &ctx,
        EditTarget::New {
            status: DecisionStatus::Proposal,
        },
        &sample_submission(),
    )? {
        SubmitOutcome::Saved(decision) => decision.id.unwrap_or(DecisionId(1)),
        SubmitOutcome::Cancelled(_) => return Ok(()),
        SubmitOutcome::Invalid(form) => {
            println!("Sample proposal rejected:");
            match serde_json::to_string_pretty(&form) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("  (form unavailable: {err})"),
            }
            return Ok(());
        }
    };

    let detail = service.detail(id)?;
    println!("OpenConsent demo");
    println!(
        "Proposal #{}: {} ({}, created {})",
        id,
        detail.decision.decision.short_name,
        detail.decision.status_label,
        today
    );

    println!("\nFeedback");
    for item in &detail.feedback_list {
        println!("  [{:<9}] {}", item.kind.label(), item.description);
    }

    println!("\nChart (max height {}px)", detail.bars.max_height);
    println!(
        "  {:<9} count {:>2}  height {:>3}  offset {:>3}",
        "all", detail.feedback_stats.all, detail.bars.all.height, detail.bars.all.left
    );
    for kind in FeedbackKind::ordered() {
        let bar = detail.bars.bar(kind);
        println!(
            "  {:<9} count {:>2}  height {:>3}  offset {:>3}",
            kind.label(),
            detail.feedback_stats.count(kind),
            bar.height,
            bar.left
        );
    }

    let csv = service.export_csv()?;
    println!("\nCSV export");
    print!("{}", String::from_utf8_lossy(&csv));
    Ok(())
}

fn sample_submission() -> FormData {
    let mut pairs = vec![
        ("short_name".to_string(), "Feed the dog".to_string()),
        (
            "description".to_string(),
            "<p>Feed the dog twice a day on a shared rota.</p>".to_string(),
        ),
        ("watch".to_string(), "on".to_string()),
        (
            "feedback_set-TOTAL_FORMS".to_string(),
            SAMPLE_FEEDBACK.len().to_string(),
        ),
        ("feedback_set-INITIAL_FORMS".to_string(), "0".to_string()),
        ("feedback_set-MAX_NUM_FORMS".to_string(), String::new()),
    ];

    for (index, (description, rating)) in SAMPLE_FEEDBACK.iter().enumerate() {
        pairs.push((
            format!("feedback_set-{index}-description"),
            description.to_string(),
        ));
        pairs.push((format!("feedback_set-{index}-rating"), rating.to_string()));
    }

    FormData::new(pairs)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openconsent::decisions::InMemoryChangeNotifier;

    #[test]
    fn sample_submission_is_accepted() {
        let service = DecisionService::new(
            Arc::new(InMemoryDecisionRepository::new()),
            Arc::new(InMemoryChangeNotifier::default()),
        );
        let ctx = RequestContext::new(
            Username::new("demo"),
            NaiveDate::from_ymd_opt(2011, 3, 14).expect("valid date"),
        );

        let outcome = service
            .submit(
                &ctx,
                EditTarget::New {
                    status: DecisionStatus::Proposal,
                },
                &sample_submission(),
            )
            .expect("submit");
        let SubmitOutcome::Saved(decision) = outcome else {
            panic!("sample should validate");
        };
        assert_eq!(decision.feedback_count(), SAMPLE_FEEDBACK.len());

        let detail = service.detail(DecisionId(1)).expect("detail");
        assert_eq!(detail.feedback_stats.consensus, 2);
        assert_eq!(detail.bars.consensus.height, 36);
        assert_eq!(detail.bars.danger.height, 18);
    }

    #[test]
    fn demo_runs_with_a_custom_chart_height() {
        run_demo(DemoArgs {
            max_height: Some(60),
            today: NaiveDate::from_ymd_opt(2011, 3, 14),
        })
        .expect("demo completes");
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(parse_date("2011-03-14").is_ok());
        assert!(parse_date("14/03/2011").is_err());
    }
}
