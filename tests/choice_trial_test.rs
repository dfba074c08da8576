mod common;

use common::FakePage;
use quiz_autocomplete::config::Config;
use quiz_autocomplete::infrastructure::{NodeRef, Role};
use quiz_autocomplete::models::{ContainerKey, ProcessedLedger};
use quiz_autocomplete::workflow::{
    ChoiceTrialEngine, ExhaustReason, QuestionCtx, TrialOutcome, TrialPhase, TrialStep,
};

/// 推进到终态，返回结果和经过的阶段数
async fn run_trial(
    page: &FakePage,
    question: NodeRef,
    ledger: &mut ProcessedLedger,
) -> (TrialOutcome, usize) {
    let config = Config::default();
    let engine = ChoiceTrialEngine::new(&config.timing, &config.vocabulary);
    let ctx = QuestionCtx::new(1, 1, ContainerKey::new("choice-q"));
    let mut run = engine.start(page, ctx, question).await.unwrap();
    let mut steps = 0;
    loop {
        steps += 1;
        assert!(steps < 100, "trial did not terminate");
        match engine.advance(page, run, ledger).await.unwrap() {
            TrialStep::Continue { run: next, .. } => run = next,
            TrialStep::Finished(outcome) => return (outcome, steps),
        }
    }
}

#[tokio::test]
async fn test_third_option_correct_takes_three_attempts() {
    let page = FakePage::new("https://learn.example.com/zybook/ch1");
    let q = page.choice_question(&["one", "two", "three", "four"], Some(2), true);
    let mut ledger = ProcessedLedger::new();

    let (outcome, _) = run_trial(&page, q.question, &mut ledger).await;

    assert_eq!(outcome, TrialOutcome::Correct { attempts: 3 });
    assert_eq!(page.checked_order(), q.inputs[..3].to_vec());
    assert_eq!(page.clicks(q.confirm.unwrap()), 3);
    assert!(ledger.is_complete(&ContainerKey::new("choice-q")));
}

#[tokio::test]
async fn test_all_wrong_is_exhausted_within_ceiling() {
    let page = FakePage::new("https://learn.example.com/zybook/ch1");
    let q = page.choice_question(&["a", "b", "c", "d"], None, true);
    let mut ledger = ProcessedLedger::new();

    let (outcome, _) = run_trial(&page, q.question, &mut ledger).await;

    match outcome {
        TrialOutcome::Exhausted { attempts, reason } => {
            assert!(attempts <= 2 * q.labels.len());
            assert_eq!(attempts, 4);
            assert_eq!(reason, ExhaustReason::OptionsExhausted);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    // 每个选项只试一次，不会回到开头
    assert_eq!(page.checked_order(), q.inputs);
    assert!(ledger.is_complete(&ContainerKey::new("choice-q")));
}

#[tokio::test]
async fn test_missing_confirm_advances_instead_of_stopping() {
    let page = FakePage::new("https://learn.example.com/zybook/ch1");
    let q = page.choice_question(&["a", "b", "c"], Some(1), false);
    let mut ledger = ProcessedLedger::new();

    let (outcome, steps) = run_trial(&page, q.question, &mut ledger).await;

    // 没有确认按钮就无法判定，三个选项都被选中过
    assert_eq!(page.checked_order(), q.inputs);
    assert!(matches!(
        outcome,
        TrialOutcome::Exhausted {
            reason: ExhaustReason::OptionsExhausted,
            ..
        }
    ));
    // 每个选项：选中 + 找确认按钮，最后一次选中阶段结束
    assert_eq!(steps, 3 * 2 + 1);
}

#[tokio::test]
async fn test_already_correct_question_finishes_without_clicking() {
    let page = FakePage::new("https://learn.example.com/zybook/ch1");
    let q = page.choice_question(&["a", "b"], Some(0), true);
    page.mark_correct(q.question);
    let mut ledger = ProcessedLedger::new();

    let (outcome, steps) = run_trial(&page, q.question, &mut ledger).await;

    assert_eq!(outcome, TrialOutcome::Correct { attempts: 0 });
    assert_eq!(steps, 1);
    assert!(page.checked_order().is_empty());
}

#[tokio::test]
async fn test_falls_back_to_inputs_without_labels() {
    let page = FakePage::new("https://learn.example.com/zybook/ch1");
    let question = page.question();
    let inputs: Vec<NodeRef> = (0..3)
        .map(|i| {
            page.add(
                Some(question),
                common::FakeNode::new("")
                    .role(Role::ChoiceInput)
                    .attr("value", &format!("v{i}")),
            )
        })
        .collect();
    page.button(question, "Submit");

    let config = Config::default();
    let engine = ChoiceTrialEngine::new(&config.timing, &config.vocabulary);
    let run = engine
        .start(&page, QuestionCtx::new(1, 1, ContainerKey::new("q")), question)
        .await
        .unwrap();

    assert_eq!(run.options.len(), 3);
    assert_eq!(run.options[1].element, inputs[1]);
    assert_eq!(run.options[1].controls, vec![inputs[1]]);
    assert_eq!(run.options[2].text, "v2");
    assert_eq!(run.state.ceiling, 6);
    assert_eq!(run.state.phase, TrialPhase::Selecting);
}

#[tokio::test]
async fn test_label_for_attribute_links_input() {
    let page = FakePage::new("https://learn.example.com/zybook/ch1");
    let question = page.question();
    let label = page.add(
        Some(question),
        common::FakeNode::new("Yes")
            .role(Role::ChoiceLabel)
            .attr("for", "opt-yes"),
    );
    let input = page.add(
        Some(question),
        common::FakeNode::new("")
            .role(Role::ChoiceInput)
            .attr("id", "opt-yes"),
    );

    let config = Config::default();
    let engine = ChoiceTrialEngine::new(&config.timing, &config.vocabulary);
    let run = engine
        .start(&page, QuestionCtx::new(1, 1, ContainerKey::new("q")), question)
        .await
        .unwrap();

    assert_eq!(run.options.len(), 1);
    assert_eq!(run.options[0].element, label);
    assert_eq!(run.options[0].controls, vec![input]);
}
