//! Orchestrator behavior tests
//!
//! Covers the run-level guarantees: declaration-order execution, context
//! accumulation between instructions, halt-on-first-failure, unknown-agent
//! handling, panic escalation, and both resolution modes.


use proptest::prelude::*;
use radpipe::agents::AgentRegistry;
use radpipe::context::ResolutionMode;
use radpipe::orchestrator::Orchestrator;
use radpipe::protocol::{
    AgentCommand, AgentInstruction, ParamValue, PipelineState, TaskDefinition, TaskState,
};
use radpipe::testing::mocks::MockAgent;
use serde_json::json;
use std::sync::Arc;
use test_helpers::{failing, succeeding};

fn chain_definition(agent_names: &[&str]) -> TaskDefinition {
    let mut definition = TaskDefinition::new("chain");
    for name in agent_names {
        definition = definition.with_instruction(AgentInstruction::new(
            AgentCommand::IndexDocument,
            *name,
        ));
    }
    definition
}

#[tokio::test]
async fn all_success_run_completes_with_ordered_statuses() {
    let mut registry = AgentRegistry::new();
    let agents: Vec<Arc<MockAgent>> = (0..4)
        .map(|i| succeeding(&format!("agent{i}"), json!({ (format!("out{i}")): i })))
        .collect();
    for (i, agent) in agents.iter().enumerate() {
        registry.register(format!("agent{i}"), agent.clone());
    }
    let orchestrator = Orchestrator::new(Arc::new(registry));

    let definition = chain_definition(&["agent0", "agent1", "agent2", "agent3"]);
    let status = orchestrator.run(&definition).await.unwrap();

    assert_eq!(status.state, PipelineState::CompletedSuccess);
    assert_eq!(status.task_statuses.len(), 4);
    for (task, instruction) in status.task_statuses.iter().zip(&definition.instructions) {
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.instruction_id, instruction.instruction_id);
    }
    for agent in &agents {
        assert_eq!(agent.invocation_count().await, 1);
    }
}

#[tokio::test]
async fn first_failure_halts_remaining_instructions() {
    let mut registry = AgentRegistry::new();
    let first = succeeding("first", json!({ "x": 1 }));
    let second = failing("second", "simulated segmentation error");
    let third = succeeding("third", json!({ "y": 2 }));
    registry.register("first", first.clone());
    registry.register("second", second.clone());
    registry.register("third", third.clone());
    let orchestrator = Orchestrator::new(Arc::new(registry));

    let status = orchestrator
        .run(&chain_definition(&["first", "second", "third"]))
        .await
        .unwrap();

    assert_eq!(status.state, PipelineState::CompletedWithErrors);
    assert_eq!(status.task_statuses.len(), 2);
    assert_eq!(status.task_statuses[0].state, TaskState::Completed);
    assert_eq!(status.task_statuses[1].state, TaskState::Failed);
    assert!(status
        .message
        .contains("simulated segmentation error"));
    assert_eq!(
        status.fatal_error.as_ref().map(|e| e.kind.as_str()),
        Some("AgentReportedFailure")
    );

    assert_eq!(first.invocation_count().await, 1);
    assert_eq!(second.invocation_count().await, 1);
    assert_eq!(third.invocation_count().await, 0);
}

#[tokio::test]
async fn unknown_agent_fails_without_invoking_anyone() {
    let mut registry = AgentRegistry::new();
    let known = succeeding("known", json!({}));
    registry.register("known", known.clone());
    let orchestrator = Orchestrator::new(Arc::new(registry));

    let status = orchestrator
        .run(&chain_definition(&["ghost", "known", "known"]))
        .await
        .unwrap();

    assert_eq!(status.state, PipelineState::Failed);
    assert_eq!(status.task_statuses.len(), 1);
    assert_eq!(status.task_statuses[0].state, TaskState::Failed);
    assert_eq!(
        status.task_statuses[0]
            .error
            .as_ref()
            .map(|e| e.kind.as_str()),
        Some("OrchestrationError")
    );
    assert_eq!(known.invocation_count().await, 0);
}

#[tokio::test]
async fn context_written_by_one_instruction_resolves_in_the_next() {
    let mut registry = AgentRegistry::new();
    let producer = succeeding("producer", json!({ "x": 1 }));
    let consumer = succeeding("consumer", json!({}));
    registry.register("producer", producer.clone());
    registry.register("consumer", consumer.clone());
    let orchestrator = Orchestrator::new(Arc::new(registry));

    let definition = TaskDefinition::new("accumulation")
        .with_instruction(AgentInstruction::new(
            AgentCommand::RetrieveDicomStudy,
            "producer",
        ))
        .with_instruction(
            AgentInstruction::new(AgentCommand::IndexDocument, "consumer")
                .with_parameter("value", ParamValue::from_context("x")),
        );
    let status = orchestrator.run(&definition).await.unwrap();

    assert!(status.is_success());
    let invocations = consumer.invocations().await;
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].1["value"], json!(1));
}

#[tokio::test]
async fn three_step_chain_delivers_resolved_values() {
    let mut registry = AgentRegistry::new();
    let agent1 = succeeding("agent1", json!({ "a_out": { "items": [10, 20] } }));
    let agent2 = succeeding("agent2", json!({ "b_out": { "summary": "from-b" } }));
    let agent3 = succeeding("agent3", json!({ "c_out": true }));
    registry.register("agent1", agent1.clone());
    registry.register("agent2", agent2.clone());
    registry.register("agent3", agent3.clone());
    let orchestrator = Orchestrator::new(Arc::new(registry));

    let definition = TaskDefinition::new("three-step")
        .with_instruction(AgentInstruction::new(
            AgentCommand::RetrieveDicomStudy,
            "agent1",
        ))
        .with_instruction(
            AgentInstruction::new(AgentCommand::PerformDlSegmentation, "agent2")
                .with_parameter("second_item", ParamValue::from_context("a_out.items.1")),
        )
        .with_instruction(
            AgentInstruction::new(AgentCommand::GenerateDiagnosticReport, "agent3")
                .with_parameter("text", ParamValue::from_context("b_out.summary"))
                .with_parameter("first_item", ParamValue::from_context("a_out.items.0")),
        );
    let status = orchestrator.run(&definition).await.unwrap();

    assert_eq!(status.state, PipelineState::CompletedSuccess);
    assert_eq!(status.task_statuses.len(), 3);

    for agent in [&agent1, &agent2, &agent3] {
        assert_eq!(agent.invocation_count().await, 1);
    }

    let second = agent2.invocations().await;
    assert_eq!(second[0].1["second_item"], json!(20));
    assert!(!ParamValue::is_marker(&second[0].1["second_item"]));

    let third = agent3.invocations().await;
    assert_eq!(third[0].1["text"], json!("from-b"));
    assert_eq!(third[0].1["first_item"], json!(10));
}

#[tokio::test]
async fn panicking_agent_fails_the_whole_pipeline() {
    let mut registry = AgentRegistry::new();
    registry.register("crash", Arc::new(MockAgent::panicking("crash")));
    let after = succeeding("after", json!({}));
    registry.register("after", after.clone());
    let orchestrator = Orchestrator::new(Arc::new(registry));

    let status = orchestrator
        .run(&chain_definition(&["crash", "after"]))
        .await
        .unwrap();

    assert_eq!(status.state, PipelineState::Failed);
    assert_eq!(status.task_statuses.len(), 1);
    assert_eq!(
        status.fatal_error.as_ref().map(|e| e.kind.as_str()),
        Some("UnexpectedPanic")
    );
    assert_eq!(after.invocation_count().await, 0);
}

#[tokio::test]
async fn permissive_mode_passes_unresolved_marker_to_the_agent() {
    let mut registry = AgentRegistry::new();
    let tolerant = succeeding("tolerant", json!({}));
    registry.register("tolerant", tolerant.clone());
    let orchestrator =
        Orchestrator::with_resolution_mode(Arc::new(registry), ResolutionMode::Permissive);

    let definition = TaskDefinition::new("permissive").with_instruction(
        AgentInstruction::new(AgentCommand::IndexDocument, "tolerant")
            .with_parameter("doc_id", ParamValue::from_context("never.set")),
    );
    let status = orchestrator.run(&definition).await.unwrap();

    assert!(status.is_success());
    let invocations = tolerant.invocations().await;
    assert!(ParamValue::is_marker(&invocations[0].1["doc_id"]));
    assert_eq!(
        invocations[0].1["doc_id"],
        json!({ "$from_context": "never.set" })
    );
}

#[tokio::test]
async fn concurrent_runs_share_the_registry_but_not_state() {
    let mut registry = AgentRegistry::new();
    let producer = succeeding("producer", json!({ "x": 1 }));
    registry.register("producer", producer.clone());
    let orchestrator = Arc::new(Orchestrator::new(Arc::new(registry)));

    let runs = (0..8).map(|i| {
        let orchestrator = orchestrator.clone();
        async move {
            let definition = TaskDefinition::new(format!("run-{i}"))
                .with_instruction(AgentInstruction::new(
                    AgentCommand::RetrieveDicomStudy,
                    "producer",
                ))
                .with_instruction(
                    AgentInstruction::new(AgentCommand::IndexDocument, "producer")
                        .with_parameter("value", ParamValue::from_context("x")),
                );
            orchestrator.run(&definition).await.unwrap()
        }
    });

    let statuses = futures::future::join_all(runs).await;

    assert_eq!(statuses.len(), 8);
    for status in &statuses {
        assert_eq!(status.state, PipelineState::CompletedSuccess);
        assert_eq!(status.task_statuses.len(), 2);
    }
    // two instructions per run, all routed to the one shared agent
    assert_eq!(producer.invocation_count().await, 16);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every all-success pipeline of length N completes with exactly N
    /// ordered, completed task statuses.
    #[test]
    fn all_success_pipelines_always_complete(n in 1usize..6) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (state, task_states, expected_ids, actual_ids) = runtime.block_on(async {
            let mut registry = AgentRegistry::new();
            for i in 0..n {
                registry.register(
                    format!("agent{i}"),
                    succeeding(&format!("agent{i}"), json!({ (format!("k{i}")): i })),
                );
            }
            let orchestrator = Orchestrator::new(Arc::new(registry));

            let mut definition = TaskDefinition::new("prop");
            for i in 0..n {
                definition = definition.with_instruction(AgentInstruction::new(
                    AgentCommand::IndexDocument,
                    format!("agent{i}"),
                ));
            }
            let expected_ids: Vec<_> = definition
                .instructions
                .iter()
                .map(|i| i.instruction_id)
                .collect();

            let status = orchestrator.run(&definition).await.unwrap();
            let task_states: Vec<_> = status.task_statuses.iter().map(|t| t.state).collect();
            let actual_ids: Vec<_> = status
                .task_statuses
                .iter()
                .map(|t| t.instruction_id)
                .collect();
            (status.state, task_states, expected_ids, actual_ids)
        });

        prop_assert_eq!(state, PipelineState::CompletedSuccess);
        prop_assert_eq!(task_states.len(), n);
        prop_assert!(task_states.iter().all(|s| *s == TaskState::Completed));
        prop_assert_eq!(actual_ids, expected_ids);
    }
}
