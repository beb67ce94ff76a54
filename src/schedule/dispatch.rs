//! Maps trigger firings onto controller and generator calls.

use super::triggers::TriggerAction;
use crate::admission::{AdmissionController, CheckState, GenerationGuard};
use crate::catalog::{HOUR, ResidentTask, TaskCatalog, TaskCategory};
use crate::error::EngineError;
use crate::generator::{TaskGenerator, TimeGranularity};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct TriggerDispatcher {
    controller: AdmissionController,
    generator: Arc<dyn TaskGenerator>,
    catalog: Arc<TaskCatalog>,
    guard: Arc<GenerationGuard>,
}

impl TriggerDispatcher {
    pub fn new(
        controller: AdmissionController,
        generator: Arc<dyn TaskGenerator>,
        catalog: Arc<TaskCatalog>,
        guard: Arc<GenerationGuard>,
    ) -> Self {
        Self {
            controller,
            generator,
            catalog,
            guard,
        }
    }

    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }

    /// Runs one trigger firing. Returns the admission outcome when the action
    /// produced one; `None` means the action ran to completion.
    ///
    /// Faults are logged and reported as code 20, named after the action when
    /// it only retires work. The next firing of the same trigger is the retry.
    pub async fn fire(&self, action: TriggerAction, now: DateTime<Utc>) -> Option<CheckState> {
        if !self.controller.settings().enabled {
            tracing::debug!(%action, "Task generation disabled, skipping trigger");
            return Some(CheckState::disabled());
        }

        match self.run(action, now).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(%action, error = %e, "Trigger action failed");
                Some(match action {
                    TriggerAction::RetireStaleCollectors | TriggerAction::ClearAsinTasks => {
                        CheckState::action_failed(action, e)
                    }
                    _ => CheckState::generation_failed(e),
                })
            }
        }
    }

    async fn run(
        &self,
        action: TriggerAction,
        now: DateTime<Utc>,
    ) -> Result<Option<CheckState>, EngineError> {
        match action {
            TriggerAction::AsinWatchdog => {
                let state = self.controller.decide(now).await;
                tracing::debug!("Asin task generation: {state}");
                Ok(Some(state))
            }
            TriggerAction::LoadingTasksAtTimePoint => {
                self.generator
                    .generate_loading_tasks_at_time_point(now, TimeGranularity::Minutes)
                    .await?;
                Ok(None)
            }
            TriggerAction::DailyAsinRegeneration => {
                let Some(_permit) = self.guard.try_acquire(TaskCategory::Asin) else {
                    tracing::debug!("ASIN generation already in progress");
                    return Ok(Some(CheckState::busy()));
                };
                self.generator.generate_asin_tasks().await?;
                Ok(None)
            }
            TriggerAction::HourlyLoadingTasks => {
                let tasks: Vec<ResidentTask> = self
                    .catalog
                    .tasks_with_period(HOUR)
                    .into_iter()
                    .map(|def| self.catalog.to_resident(def))
                    .collect();
                self.generator.generate_loading_tasks(&tasks, true).await?;
                Ok(None)
            }
            TriggerAction::RetireStaleCollectors => {
                self.generator.clear_if_not_in_run_time(now).await?;
                Ok(None)
            }
            TriggerAction::ClearAsinTasks => {
                self.generator.clear_all(TaskCategory::Asin).await?;
                Ok(None)
            }
        }
    }
}
