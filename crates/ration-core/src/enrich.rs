//! Background recipe enrichment.
//!
//! Once a week plan is saved, a fixed number of workers walk its meals
//! through a shared index and attach a recipe to each one. A meal whose
//! recipe cannot be produced gets the empty recipe instead; nothing a
//! single meal does can stop the others.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use ration_db::models::Goal;

use crate::cache::{Caches, RecipeCacheKey};
use crate::generation::{CompletionOptions, GenerationClient};
use crate::parse::parse_into;
use crate::plan::prompt::{RECIPE_TEMPERATURE, recipe_messages};
use crate::plan::{Meal, Recipe};
use crate::store::PlanStore;

/// Default number of concurrent enrichment workers.
pub const DEFAULT_WORKERS: usize = 3;

/// How far an enrichment run has got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentProgress {
    pub completed: usize,
    pub total: usize,
}

impl EnrichmentProgress {
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Outcome counts of a finished enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub total: usize,
    /// Recipes produced by the generation service.
    pub generated: usize,
    /// Recipes taken from the recipe cache.
    pub cached: usize,
    /// Meals that got the empty recipe.
    pub fallback: usize,
    /// Meals whose recipe could not be written to the store.
    pub persist_failures: usize,
    /// Meals never picked up because the run was cancelled.
    pub skipped: usize,
}

impl EnrichmentReport {
    fn merge(mut self, other: Self) -> Self {
        self.generated += other.generated;
        self.cached += other.cached;
        self.fallback += other.fallback;
        self.persist_failures += other.persist_failures;
        self
    }

    fn processed(&self) -> usize {
        self.generated + self.cached + self.fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipeSource {
    Generated,
    Cached,
    Fallback,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Completion signal of a background enrichment run.
///
/// Dropping the handle does not stop the run; use [`EnrichmentHandle::cancel`].
#[derive(Debug)]
pub struct EnrichmentHandle {
    task: JoinHandle<EnrichmentReport>,
    progress: watch::Receiver<EnrichmentProgress>,
    cancel: CancellationToken,
}

impl EnrichmentHandle {
    /// A handle for a run with nothing left to do.
    pub fn completed(report: EnrichmentReport) -> Self {
        let (_, progress) = watch::channel(EnrichmentProgress {
            completed: report.total,
            total: report.total,
        });
        Self {
            task: tokio::spawn(async move { report }),
            progress,
            cancel: CancellationToken::new(),
        }
    }

    pub fn progress(&self) -> EnrichmentProgress {
        *self.progress.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop handing out meals. Meals already in progress still finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Result<EnrichmentReport, JoinError> {
        self.task.await
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Spawns enrichment runs against a shared client, store and cache.
#[derive(Clone)]
pub struct Enricher {
    client: Arc<GenerationClient>,
    store: Arc<dyn PlanStore>,
    caches: Arc<Caches>,
    workers: usize,
}

impl Enricher {
    pub fn new(
        client: Arc<GenerationClient>,
        store: Arc<dyn PlanStore>,
        caches: Arc<Caches>,
        workers: usize,
    ) -> Self {
        Self {
            client,
            store,
            caches,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start enriching `meals` in the background and return immediately.
    ///
    /// Meals without a store-assigned id are skipped. `cancel` stops
    /// workers from picking up further meals.
    pub fn spawn(
        &self,
        week_plan_id: Uuid,
        goal: Goal,
        meals: Vec<Meal>,
        cancel: CancellationToken,
    ) -> EnrichmentHandle {
        let meals: Vec<(Uuid, Meal)> = meals
            .into_iter()
            .filter_map(|meal| match meal.id {
                Some(id) => Some((id, meal)),
                None => {
                    tracing::warn!(%week_plan_id, name = %meal.name, "meal has no id, not enriching");
                    None
                }
            })
            .collect();

        let (tx, rx) = watch::channel(EnrichmentProgress {
            completed: 0,
            total: meals.len(),
        });

        let enricher = self.clone();
        let token = cancel.clone();
        let span = tracing::info_span!("enrichment", %week_plan_id);
        let task = tokio::spawn(
            async move { enricher.run(goal, meals, token, tx).await }.instrument(span),
        );

        EnrichmentHandle {
            task,
            progress: rx,
            cancel,
        }
    }

    async fn run(
        &self,
        goal: Goal,
        meals: Vec<(Uuid, Meal)>,
        cancel: CancellationToken,
        progress: watch::Sender<EnrichmentProgress>,
    ) -> EnrichmentReport {
        let total = meals.len();
        tracing::info!(meals = total, workers = self.workers, "starting recipe enrichment");

        let next = AtomicUsize::new(0);
        let workers = (0..self.workers.min(total.max(1)))
            .map(|worker| self.worker(worker, goal, &meals, &next, &cancel, &progress));
        let report = futures::future::join_all(workers)
            .await
            .into_iter()
            .fold(EnrichmentReport::default(), EnrichmentReport::merge);

        let report = EnrichmentReport {
            total,
            skipped: total - report.processed(),
            ..report
        };
        tracing::info!(
            generated = report.generated,
            cached = report.cached,
            fallback = report.fallback,
            persist_failures = report.persist_failures,
            skipped = report.skipped,
            "recipe enrichment finished"
        );
        report
    }

    async fn worker(
        &self,
        worker: usize,
        goal: Goal,
        meals: &[(Uuid, Meal)],
        next: &AtomicUsize,
        cancel: &CancellationToken,
        progress: &watch::Sender<EnrichmentProgress>,
    ) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();

        while !cancel.is_cancelled() {
            let index = next.fetch_add(1, Ordering::SeqCst);
            let Some((meal_id, meal)) = meals.get(index) else {
                break;
            };

            let (recipe, source) = match AssertUnwindSafe(self.obtain_recipe(meal, goal))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(worker, %meal_id, "recipe generation panicked");
                    (Recipe::empty(), RecipeSource::Fallback)
                }
            };

            match source {
                RecipeSource::Generated => report.generated += 1,
                RecipeSource::Cached => report.cached += 1,
                RecipeSource::Fallback => report.fallback += 1,
            }

            let persisted = AssertUnwindSafe(self.store.update_meal_recipe(*meal_id, &recipe))
                .catch_unwind()
                .await;
            match persisted {
                Ok(Ok(())) => {
                    tracing::debug!(worker, %meal_id, ?source, "recipe stored");
                }
                Ok(Err(e)) => {
                    tracing::warn!(worker, %meal_id, error = %e, "failed to store recipe");
                    report.persist_failures += 1;
                }
                Err(_) => {
                    tracing::error!(worker, %meal_id, "storing recipe panicked");
                    report.persist_failures += 1;
                }
            }

            progress.send_modify(|p| p.completed += 1);
        }

        report
    }

    /// Cached recipe, freshly generated recipe, or the empty recipe.
    async fn obtain_recipe(&self, meal: &Meal, goal: Goal) -> (Recipe, RecipeSource) {
        let key = RecipeCacheKey::new(&meal.name, meal.calories);
        if let Some(recipe) = self.caches.recipes.get(&key).await {
            return (recipe, RecipeSource::Cached);
        }

        let raw = match self
            .client
            .complete(recipe_messages(meal, goal), CompletionOptions::json(RECIPE_TEMPERATURE))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(name = %meal.name, error = %e, "recipe generation failed");
                return (Recipe::empty(), RecipeSource::Fallback);
            }
        };

        match parse_into::<Recipe>(&raw) {
            Ok(recipe) if !recipe.is_empty() => {
                self.caches.recipes.insert(key, recipe.clone()).await;
                (recipe, RecipeSource::Generated)
            }
            Ok(_) => {
                tracing::warn!(name = %meal.name, "generated recipe is empty");
                (Recipe::empty(), RecipeSource::Fallback)
            }
            Err(e) => {
                tracing::warn!(name = %meal.name, error = %e, "recipe response unreadable");
                (Recipe::empty(), RecipeSource::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_merge_sums_counts() {
        let a = EnrichmentReport {
            generated: 2,
            cached: 1,
            ..Default::default()
        };
        let b = EnrichmentReport {
            fallback: 1,
            persist_failures: 1,
            ..Default::default()
        };
        let merged = a.merge(b);
        assert_eq!(merged.processed(), 4);
        assert_eq!(merged.persist_failures, 1);
    }

    #[tokio::test]
    async fn completed_handle_reports_immediately() {
        let report = EnrichmentReport {
            total: 21,
            cached: 21,
            ..Default::default()
        };
        let handle = EnrichmentHandle::completed(report);
        assert!(handle.progress().is_done());
        assert_eq!(handle.wait().await.unwrap(), report);
    }
}
