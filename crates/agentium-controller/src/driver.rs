//! The phase state machine.
//!
//! For every task the driver walks PLAN → IMPLEMENT → DOCS → VERIFY. Each
//! phase runs bounded worker → reviewer → judge iterations: the worker
//! produces a hand-off, the reviewer grades it, the judge emits exactly
//! one ADVANCE / ITERATE / BLOCKED verdict. A reviewer may instead demand
//! regression to an earlier phase, which cascade-clears hand-offs.

use crate::session::Session;
use agentium_agent::{
    AgentAdapter, AdapterRegistry, Invocation, IterationResult, PromptParts, SkillBlock,
    run_agent,
};
use agentium_core::{
    parse_verdicts, AgentiumError, AgentiumResult, Phase, Role, Verdict,
};
use agentium_handoff::{
    builders, parse_handoff, validate_docs, validate_implement, validate_phase_input,
    validate_plan, validate_verify, DocsOutput, ExistingWork, HandoffStore, ImplementOutput,
    PlanOutput, ReviewOutput, VerifyOutput,
};
use agentium_memory::{parse_memory_signals, MemoryStore, SignalType};
use agentium_skills::SkillLibrary;
use agentium_trace::{
    GenerationInput, GenerationName, GenerationStatus, PhaseEnd, SpanCtx, TraceEnd, Tracer,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How agents are launched. Injectable so tests can script results
/// instead of spawning real CLIs.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn run(
        &self,
        adapter: &dyn AgentAdapter,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> AgentiumResult<IterationResult>;
}

/// Launches the adapter's real CLI subprocess.
pub struct SubprocessLauncher;

#[async_trait]
impl AgentLauncher for SubprocessLauncher {
    async fn run(
        &self,
        adapter: &dyn AgentAdapter,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> AgentiumResult<IterationResult> {
        run_agent(adapter, invocation, cancel).await
    }
}

/// Terminal state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Complete,
    Blocked { reason: String },
}

/// Terminal state of the whole session.
#[derive(Debug)]
pub struct SessionReport {
    pub outcomes: Vec<(String, TaskOutcome)>,
}

impl SessionReport {
    /// Whether every task reached COMPLETE.
    pub fn all_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == TaskOutcome::Complete)
    }
}

enum PhaseOutcome {
    Advance,
    Blocked(String),
    Regress { target: Phase, reason: String },
}

struct RoleRun {
    result: IterationResult,
    prompt: String,
    started_at: chrono::DateTime<Utc>,
    ended_at: chrono::DateTime<Utc>,
}

/// Drives the pipeline for every task in a session.
pub struct PhaseDriver {
    session: Session,
    registry: Arc<AdapterRegistry>,
    handoff: Arc<HandoffStore>,
    memory: Arc<MemoryStore>,
    skills: Arc<SkillLibrary>,
    tracer: Arc<dyn Tracer>,
    launcher: Arc<dyn AgentLauncher>,
    cancel: CancellationToken,
}

impl PhaseDriver {
    pub fn new(
        session: Session,
        registry: Arc<AdapterRegistry>,
        handoff: Arc<HandoffStore>,
        memory: Arc<MemoryStore>,
        skills: Arc<SkillLibrary>,
        tracer: Arc<dyn Tracer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            registry,
            handoff,
            memory,
            skills,
            tracer,
            launcher: Arc::new(SubprocessLauncher),
            cancel,
        }
    }

    /// Replace the launcher, for tests.
    pub fn with_launcher(mut self, launcher: Arc<dyn AgentLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Run every task to a terminal state.
    pub async fn run(&self) -> AgentiumResult<SessionReport> {
        let deadline = self
            .session
            .config
            .budgets
            .max_wall_clock_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));

        let mut regressions_used = HashSet::new();
        let mut outcomes = Vec::new();

        for task_id in self.session.config.task_ids() {
            info!(task_id = %task_id, "Starting task");
            let outcome = self
                .run_task(&task_id, deadline, &mut regressions_used)
                .await?;

            // The in-memory stores stay authoritative; persistence
            // failures are logged and do not abort the session.
            if let Err(e) = self.handoff.save().await {
                warn!(error = %e, "Hand-off store save failed");
            }
            if let Err(e) = self.memory.save().await {
                warn!(error = %e, "Memory store save failed");
            }

            info!(task_id = %task_id, outcome = ?outcome, "Task finished");
            outcomes.push((task_id, outcome));
        }

        if let Err(e) = self.tracer.flush().await {
            warn!(error = %e, "Trace flush failed");
        }
        Ok(SessionReport { outcomes })
    }

    async fn run_task(
        &self,
        task_id: &str,
        deadline: Option<Instant>,
        regressions_used: &mut HashSet<(Phase, Phase)>,
    ) -> AgentiumResult<TaskOutcome> {
        let trace = self.tracer.start_trace(task_id);
        let mut phase = Phase::Plan;
        let mut global_iteration: u32 = 0;
        let mut total_input_tokens: u64 = 0;
        let mut total_output_tokens: u64 = 0;

        let outcome = loop {
            if let Err(e) = validate_phase_input(&self.handoff, task_id, phase).await {
                break TaskOutcome::Blocked {
                    reason: e.to_string(),
                };
            }

            let span = self.tracer.start_phase(&trace, &phase.to_string());
            let phase_started = Instant::now();
            let phase_outcome = self
                .run_phase(
                    task_id,
                    phase,
                    &span,
                    deadline,
                    &mut global_iteration,
                    &mut total_input_tokens,
                    &mut total_output_tokens,
                    regressions_used,
                )
                .await?;

            let status = match &phase_outcome {
                PhaseOutcome::Advance => "advanced".to_string(),
                PhaseOutcome::Blocked(reason) => format!("blocked: {reason}"),
                PhaseOutcome::Regress { target, .. } => format!("regressed to {target}"),
            };
            self.tracer.end_phase(
                &span,
                PhaseEnd {
                    status,
                    duration_ms: phase_started.elapsed().as_millis() as u64,
                    input: None,
                    output: None,
                },
            );

            match phase_outcome {
                PhaseOutcome::Advance => {
                    self.memory
                        .record(
                            SignalType::PhaseResult,
                            format!("{phase} advanced"),
                            task_id,
                            global_iteration,
                            0,
                        )
                        .await;
                    match phase.next() {
                        None => break TaskOutcome::Complete,
                        Some(next) => phase = next,
                    }
                }
                PhaseOutcome::Blocked(reason) => break TaskOutcome::Blocked { reason },
                PhaseOutcome::Regress { target, reason } => {
                    info!(task_id, from = %phase, to = %target, reason = %reason, "Regressing");
                    self.handoff.clear_from_phase(task_id, target).await;
                    phase = target;
                }
            }
        };

        let status = match &outcome {
            TaskOutcome::Complete => "COMPLETE".to_string(),
            TaskOutcome::Blocked { reason } => format!("BLOCKED: {reason}"),
        };
        self.tracer.complete_trace(
            &trace,
            TraceEnd {
                status,
                total_input_tokens,
                total_output_tokens,
            },
        );
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_phase(
        &self,
        task_id: &str,
        phase: Phase,
        span: &SpanCtx,
        deadline: Option<Instant>,
        global_iteration: &mut u32,
        total_input_tokens: &mut u64,
        total_output_tokens: &mut u64,
        regressions_used: &mut HashSet<(Phase, Phase)>,
    ) -> AgentiumResult<PhaseOutcome> {
        let max_iterations = self
            .session
            .config
            .budgets_for_task(task_id)
            .max_iterations(phase);
        let route = self
            .session
            .config
            .routing_for_task(task_id)
            .route_for_phase(phase)
            .clone();
        let adapter = self.registry.create(&route.adapter)?;
        adapter.validate()?;

        for phase_iteration in 1..=max_iterations {
            if self.cancel.is_cancelled() {
                return Ok(PhaseOutcome::Blocked("cancelled".into()));
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(PhaseOutcome::Blocked("timeout".into()));
            }
            *global_iteration += 1;
            info!(
                task_id,
                phase = %phase,
                phase_iteration,
                max_iterations,
                "Phase iteration"
            );

            // --- WORKER -------------------------------------------------
            let worker_prompt = self.worker_prompt(task_id, phase).await?;
            let invocation = self.invocation(
                task_id,
                phase,
                Role::Worker,
                phase_iteration,
                *global_iteration,
                &route.model,
                worker_prompt,
            );
            let worker = match self.run_role(&*adapter, &invocation).await? {
                Some(run) => run,
                None => return Ok(PhaseOutcome::Blocked("cancelled".into())),
            };
            self.record_generation(span, GenerationName::Worker, &route.model, &worker);
            accumulate_tokens(&worker.result, total_input_tokens, total_output_tokens);

            if worker.result.exit_code != 0 {
                let reason = format!("worker_exit_nonzero={}", worker.result.exit_code);
                error!(task_id, phase = %phase, reason = %reason, "Worker failed");
                self.memory
                    .record(
                        SignalType::Error,
                        worker
                            .result
                            .error
                            .clone()
                            .unwrap_or_else(|| reason.clone()),
                        task_id,
                        *global_iteration,
                        phase_iteration,
                    )
                    .await;
                self.tracer.record_skipped(span, "Reviewer", &reason);
                self.tracer.record_skipped(span, "Judge", &reason);
                continue;
            }

            // Edits outside the package scope void the iteration: the
            // working tree is restored and the worker gets another try.
            if let Some(reason) = self.enforce_scope(task_id).await {
                self.tracer.record_skipped(span, "Reviewer", &reason);
                self.tracer.record_skipped(span, "Judge", &reason);
                continue;
            }

            // Memory and hand-off signals from the worker stream.
            let signals = parse_memory_signals(&worker.result.raw_text);
            self.memory
                .update(task_id, *global_iteration, phase_iteration, &signals)
                .await;

            if let Err(reason) = self
                .store_worker_handoff(task_id, phase, &worker.result.raw_text)
                .await
            {
                warn!(task_id, phase = %phase, reason = %reason, "Invalid hand-off, iterating");
                self.tracer.record_skipped(span, "Reviewer", &reason);
                self.tracer.record_skipped(span, "Judge", &reason);
                continue;
            }

            // --- REVIEWER -----------------------------------------------
            let reviewer_prompt = self.reviewer_prompt(phase, &worker.result.raw_text);
            let invocation = self.invocation(
                task_id,
                phase,
                Role::Reviewer,
                phase_iteration,
                *global_iteration,
                &route.model,
                reviewer_prompt,
            );
            let review = match self.run_role(&*adapter, &invocation).await? {
                Some(run) => run,
                None => return Ok(PhaseOutcome::Blocked("cancelled".into())),
            };
            self.record_generation(span, GenerationName::Reviewer, &route.model, &review);
            accumulate_tokens(&review.result, total_input_tokens, total_output_tokens);

            self.memory
                .record(
                    SignalType::EvalFeedback,
                    review.result.raw_text.clone(),
                    task_id,
                    *global_iteration,
                    phase_iteration,
                )
                .await;

            // A reviewer may demand a return to an earlier phase; honored
            // once per (origin, target) pair in the session.
            let review_output: Option<ReviewOutput> =
                parse_handoff(&review.result.raw_text).ok().flatten();
            if let Some(output) = review_output {
                if output.regression_needed {
                    let target = output.regression_target.unwrap_or(Phase::Plan);
                    let reason = output
                        .regression_reason
                        .unwrap_or_else(|| "review requested regression".into());
                    if target < phase && regressions_used.insert((phase, target)) {
                        self.tracer.record_skipped(span, "Judge", "regression requested");
                        self.memory
                            .clear_stale_eval_feedback(task_id, phase_iteration)
                            .await;
                        return Ok(PhaseOutcome::Regress { target, reason });
                    }
                    warn!(
                        task_id,
                        from = %phase,
                        to = %target,
                        "Regression refused (invalid target or already used)"
                    );
                }
            }

            // --- JUDGE --------------------------------------------------
            let judge_prompt = self
                .judge_prompt(task_id, phase, phase_iteration, &review.result.raw_text)
                .await;
            let invocation = self.invocation(
                task_id,
                phase,
                Role::Judge,
                phase_iteration,
                *global_iteration,
                &route.model,
                judge_prompt,
            );
            let judge = match self.run_role(&*adapter, &invocation).await? {
                Some(run) => run,
                None => return Ok(PhaseOutcome::Blocked("cancelled".into())),
            };
            self.record_generation(span, GenerationName::Judge, &route.model, &judge);
            accumulate_tokens(&judge.result, total_input_tokens, total_output_tokens);

            let verdicts = parse_verdicts(&judge.result.raw_text);
            let verdict = match verdicts.first() {
                None => {
                    warn!(task_id, phase = %phase, "Judge emitted no verdict, iterating");
                    self.memory
                        .record(
                            SignalType::JudgeDirective,
                            "no_verdict",
                            task_id,
                            *global_iteration,
                            phase_iteration,
                        )
                        .await;
                    continue;
                }
                Some(first) => {
                    if verdicts.len() > 1 {
                        warn!(
                            task_id,
                            phase = %phase,
                            count = verdicts.len(),
                            "Judge emitted several verdicts, taking the first"
                        );
                    }
                    first.clone()
                }
            };

            self.memory
                .record(
                    SignalType::JudgeDirective,
                    verdict.to_string(),
                    task_id,
                    *global_iteration,
                    phase_iteration,
                )
                .await;

            match verdict {
                Verdict::Advance => return Ok(PhaseOutcome::Advance),
                Verdict::Iterate { reason } => {
                    info!(task_id, phase = %phase, reason = %reason, "Judge: iterate");
                }
                Verdict::Blocked { reason } => return Ok(PhaseOutcome::Blocked(reason)),
            }
        }

        Ok(PhaseOutcome::Blocked("iterations_exhausted".into()))
    }

    /// When a package scope is configured, reject out-of-scope edits and
    /// restore the working tree. Returns the ITERATE reason on violation.
    async fn enforce_scope(&self, task_id: &str) -> Option<String> {
        let package_scope = self.session.config.package_scope.as_deref()?;
        let validator = crate::scope::ScopeValidator::new(package_scope);
        let work_dir = self.session.config.work_dir.clone();

        match validator.check(&work_dir).await {
            Ok(violations) if violations.is_empty() => None,
            Ok(violations) => {
                warn!(task_id, ?violations, "Scope violation, restoring working tree");
                if let Err(e) = validator.restore(&work_dir).await {
                    error!(error = %e, "Working tree restore failed");
                }
                Some(format!("scope_violation: {}", violations.join(", ")))
            }
            Err(e) => {
                // Scope checking must not wedge the pipeline on git
                // hiccups; log and let the iteration proceed.
                warn!(error = %e, "Scope check failed");
                None
            }
        }
    }

    /// Launch one role. `Ok(None)` means the session was cancelled.
    async fn run_role(
        &self,
        adapter: &dyn AgentAdapter,
        invocation: &Invocation,
    ) -> AgentiumResult<Option<RoleRun>> {
        let prompt = adapter.build_prompt(invocation);
        let started_at = Utc::now();
        match self.launcher.run(adapter, invocation, &self.cancel).await {
            Ok(result) => Ok(Some(RoleRun {
                result,
                prompt,
                started_at,
                ended_at: Utc::now(),
            })),
            Err(AgentiumError::Cancelled) => Ok(None),
            Err(e) => {
                // A launch failure (not a nonzero exit) behaves like a
                // failed subprocess: surfaced as a result the iteration
                // loop treats as a worker failure.
                error!(role = %invocation.role, error = %e, "Agent launch failed");
                let mut result = IterationResult::bare(-1, "");
                result.error = Some(e.to_string());
                result.success = false;
                Ok(Some(RoleRun {
                    result,
                    prompt,
                    started_at,
                    ended_at: Utc::now(),
                }))
            }
        }
    }

    /// Parse and store the worker's hand-off for this phase. A missing
    /// signal is fine (prerequisites will catch it); a malformed or
    /// invalid one returns the ITERATE reason.
    async fn store_worker_handoff(
        &self,
        task_id: &str,
        phase: Phase,
        stdout: &str,
    ) -> Result<(), String> {
        match phase {
            Phase::Plan => {
                let Some(output) = parse_handoff::<PlanOutput>(stdout)
                    .map_err(|_| "invalid_handoff_json".to_string())?
                else {
                    return Ok(());
                };
                validate_plan(&output).map_err(|e| e.to_string())?;
                self.handoff.set_plan_output(task_id, output).await;
            }
            Phase::Implement => {
                let Some(output) = parse_handoff::<ImplementOutput>(stdout)
                    .map_err(|_| "invalid_handoff_json".to_string())?
                else {
                    return Ok(());
                };
                validate_implement(&output).map_err(|e| e.to_string())?;
                self.handoff.set_implement_output(task_id, output).await;
            }
            Phase::Docs => {
                let Some(output) = parse_handoff::<DocsOutput>(stdout)
                    .map_err(|_| "invalid_handoff_json".to_string())?
                else {
                    return Ok(());
                };
                validate_docs(&output).map_err(|e| e.to_string())?;
                self.handoff.set_docs_output(task_id, output).await;
            }
            Phase::Verify => {
                let Some(output) = parse_handoff::<VerifyOutput>(stdout)
                    .map_err(|_| "invalid_handoff_json".to_string())?
                else {
                    return Ok(());
                };
                validate_verify(&output).map_err(|e| e.to_string())?;
                self.handoff.set_verify_output(task_id, output).await;
            }
        }
        Ok(())
    }

    async fn worker_prompt(&self, task_id: &str, phase: Phase) -> AgentiumResult<PromptParts> {
        let phase_input = self.build_phase_input(task_id, phase).await?;
        let memory_context = self.memory.build_context(task_id).await;

        let mut user_prompt = format!(
            "You are the worker for task {task_id}, executing the {phase} phase. \
             Finish by emitting this phase's AGENTIUM_HANDOFF."
        );
        if !memory_context.is_empty() {
            user_prompt.push_str("\n\n# Session memory\n\n");
            user_prompt.push_str(&memory_context);
        }

        let skills = self
            .skills
            .for_phase(phase)
            .iter()
            .map(|s| SkillBlock {
                name: s.name().to_string(),
                content: s.content().to_string(),
            })
            .collect();

        Ok(PromptParts {
            system_prompt: self.session.system_prompt.clone(),
            project_prompt: self.session.project_prompt.clone().unwrap_or_default(),
            user_prompt,
            skills,
            phase_input: Some(phase_input),
        })
    }

    fn reviewer_prompt(&self, phase: Phase, worker_output: &str) -> PromptParts {
        let user_prompt = format!(
            "You are the reviewer for the {phase} phase. Assess the worker output below \
             for correctness, completeness, and scope. If the pipeline must return to an \
             earlier phase, emit an AGENTIUM_HANDOFF object with regression_needed, \
             regression_reason, and optionally regression_target.\n\n\
             # Worker output\n\n{worker_output}"
        );
        PromptParts {
            system_prompt: self.session.system_prompt.clone(),
            project_prompt: String::new(),
            user_prompt,
            skills: Vec::new(),
            phase_input: None,
        }
    }

    async fn judge_prompt(
        &self,
        task_id: &str,
        phase: Phase,
        phase_iteration: u32,
        review_text: &str,
    ) -> PromptParts {
        let eval_context = self.memory.build_eval_context(task_id).await;
        let current = self
            .memory
            .build_current_iteration_eval_context(task_id, phase_iteration)
            .await;

        let mut user_prompt = format!(
            "You are the judge for the {phase} phase. Decide whether the phase may \
             advance. Emit exactly one line: AGENTIUM_EVAL: ADVANCE, \
             AGENTIUM_EVAL: ITERATE <reason>, or AGENTIUM_EVAL: BLOCKED <reason>."
        );
        if !eval_context.is_empty() {
            user_prompt.push_str("\n\n# Prior evaluations\n\n");
            user_prompt.push_str(&eval_context);
        }
        if !current.is_empty() {
            user_prompt.push_str("\n\n# This iteration's review feedback\n\n");
            user_prompt.push_str(&current);
        }
        user_prompt.push_str("\n\n# Reviewer output\n\n");
        user_prompt.push_str(review_text);

        PromptParts {
            system_prompt: self.session.system_prompt.clone(),
            project_prompt: String::new(),
            user_prompt,
            skills: Vec::new(),
            phase_input: None,
        }
    }

    async fn build_phase_input(&self, task_id: &str, phase: Phase) -> AgentiumResult<String> {
        let issue = self
            .handoff
            .issue_context(task_id)
            .await
            .ok_or_else(|| AgentiumError::Handoff(format!("{task_id}: missing issue")))?;

        match phase {
            Phase::Plan => Ok(builders::build_plan_input(&issue)),
            Phase::Implement => {
                let plan = self
                    .handoff
                    .plan_output(task_id)
                    .await
                    .ok_or_else(|| AgentiumError::Handoff(format!("{task_id}: missing plan")))?;
                // Prior implement work survives an ITERATE; surface it so
                // the worker resumes instead of restarting.
                let existing = self.handoff.implement_output(task_id).await.map(|i| {
                    ExistingWork {
                        branch: i.branch_name,
                        pr_url: i.draft_pr_url,
                    }
                });
                Ok(builders::build_implement_input(
                    &issue,
                    &plan,
                    existing.as_ref(),
                ))
            }
            Phase::Docs | Phase::Verify => {
                let plan = self
                    .handoff
                    .plan_output(task_id)
                    .await
                    .ok_or_else(|| AgentiumError::Handoff(format!("{task_id}: missing plan")))?;
                let implement = self.handoff.implement_output(task_id).await.ok_or_else(|| {
                    AgentiumError::Handoff(format!("{task_id}: missing implement output"))
                })?;
                if phase == Phase::Docs {
                    Ok(builders::build_docs_input(&issue, &plan, &implement))
                } else {
                    Ok(builders::build_verify_input(&issue, &plan, &implement))
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn invocation(
        &self,
        task_id: &str,
        phase: Phase,
        role: Role,
        phase_iteration: u32,
        global_iteration: u32,
        model: &str,
        prompt: PromptParts,
    ) -> Invocation {
        let mut metadata = self.session.config.metadata.clone();
        metadata.insert("AGENTIUM_TASK_ID".into(), task_id.to_string());
        Invocation {
            session_id: self.session.id,
            iteration: global_iteration,
            phase_iteration,
            phase,
            role,
            model: model.to_string(),
            repository: self.session.config.repository.clone(),
            work_dir: self.session.config.work_dir.clone(),
            prompt,
            metadata,
        }
    }

    fn record_generation(
        &self,
        span: &SpanCtx,
        name: GenerationName,
        model: &str,
        run: &RoleRun,
    ) {
        let tokens = run.result.tokens_used.unwrap_or_default();
        self.tracer.record_generation(
            span,
            GenerationInput {
                name,
                model: model.to_string(),
                input: run.prompt.clone(),
                output: run.result.raw_text.clone(),
                system_prompt: Some(self.session.system_prompt.clone()),
                input_tokens: tokens.input_tokens,
                output_tokens: tokens.output_tokens,
                status: if run.result.success {
                    GenerationStatus::Completed
                } else {
                    GenerationStatus::Error
                },
                started_at: run.started_at,
                ended_at: run.ended_at,
            },
        );
    }
}

fn accumulate_tokens(result: &IterationResult, input: &mut u64, output: &mut u64) {
    if let Some(tokens) = result.tokens_used {
        *input += tokens.input_tokens;
        *output += tokens.output_tokens;
    }
}
