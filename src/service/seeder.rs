//! Wipe and repopulate every registered entity with synthetic rows.
//!
//! Relation generators draw from the target's *declared* seed count, so the
//! values are valid regardless of seeding order. Entities are still seeded in
//! dependency waves (targets first) so pre-insert hooks can read related rows;
//! entities within a wave, and rows within an entity, are inserted concurrently.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::{load_related, run_pre_insert};
use crate::store::{Row, RowStore};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeededEntity {
    pub slug: String,
    pub rows: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub entities: Vec<SeededEntity>,
}

impl SeedReport {
    pub fn rows_for(&self, slug: &str) -> Option<u64> {
        self.entities.iter().find(|e| e.slug == slug).map(|e| e.rows)
    }
}

#[derive(Clone)]
pub struct Seeder {
    model: Arc<ResolvedModel>,
    store: Arc<dyn RowStore>,
}

impl Seeder {
    pub fn new(model: Arc<ResolvedModel>, store: Arc<dyn RowStore>) -> Self {
        Seeder { model, store }
    }

    /// Destroy all rows (resetting identities), then insert `seed_count` rows per entity.
    /// A failing generator or hook aborts the run; it can be re-run from a clean slate.
    pub async fn seed_all(&self) -> Result<SeedReport, AppError> {
        let store = self.store.as_ref();
        try_join_all(self.model.iter().map(|e| store.truncate(e))).await?;
        tracing::info!(entities = self.model.len(), "wiped all entities");

        let mut report = SeedReport::default();
        for (n, wave) in seed_waves(&self.model).into_iter().enumerate() {
            tracing::debug!(wave = n, entities = ?wave.iter().map(|e| e.slug()).collect::<Vec<_>>(), "seeding wave");
            let counts = try_join_all(wave.iter().map(|e| self.seed_entity(e))).await?;
            for (entity, rows) in wave.iter().zip(counts) {
                report.entities.push(SeededEntity {
                    slug: entity.slug().to_string(),
                    rows,
                });
            }
        }
        tracing::info!(
            rows = report.entities.iter().map(|e| e.rows).sum::<u64>(),
            "seeding finished"
        );
        Ok(report)
    }

    async fn seed_entity(&self, entity: &ResolvedEntity) -> Result<u64, AppError> {
        let rows = (0..entity.definition.seed_count)
            .map(|i| synthesize_row(&self.model, entity, i))
            .collect::<Result<Vec<_>, _>>()?;
        let store = self.store.as_ref();
        let model = self.model.as_ref();
        let inserted = try_join_all(rows.into_iter().map(|mut row| async move {
            if !entity.pre_insert.is_empty() {
                let related = load_related(store, model, entity, &row, false).await?;
                run_pre_insert(entity, &mut row, &related)?;
            }
            store.insert(entity, row).await
        }))
        .await?;
        tracing::info!(entity = %entity.slug(), rows = inserted.len(), "seeded");
        Ok(inserted.len() as u64)
    }
}

/// One synthetic row: every property's generator applied to `(row_index, related_seed_count)`.
pub fn synthesize_row(model: &ResolvedModel, entity: &ResolvedEntity, row_index: u64) -> Result<Row, AppError> {
    let mut row = Row::new();
    for prop in &entity.properties {
        let related_seed_count = match prop.relation() {
            Some(rel) => model.describe_entity(&rel.entity)?.seed_count,
            None => 0,
        };
        let value = prop
            .generator
            .generate(row_index, related_seed_count)
            .map_err(|source| AppError::Generator {
                entity: entity.slug().to_string(),
                property: prop.prop_name.clone(),
                source,
            })?;
        row.insert(prop.column.clone(), value);
    }
    Ok(row)
}

/// Group entities so every relation target lands in an earlier wave than its referrers.
/// Self-relations are ignored; entities caught in a relation cycle form a final wave.
pub fn seed_waves(model: &ResolvedModel) -> Vec<Vec<&ResolvedEntity>> {
    let mut pending: HashMap<&str, BTreeSet<&str>> = model
        .iter()
        .map(|e| {
            let deps = e
                .relations()
                .map(|(_, rel)| rel.entity.as_str())
                .filter(|target| *target != e.slug())
                .collect();
            (e.slug(), deps)
        })
        .collect();

    let mut waves = Vec::new();
    while !pending.is_empty() {
        let ready: Vec<&ResolvedEntity> = model
            .iter()
            .filter(|e| pending.get(e.slug()).map(|d| d.is_empty()).unwrap_or(false))
            .collect();
        if ready.is_empty() {
            let cycle: Vec<&ResolvedEntity> = model.iter().filter(|e| pending.contains_key(e.slug())).collect();
            tracing::warn!(
                entities = ?cycle.iter().map(|e| e.slug()).collect::<Vec<_>>(),
                "relation cycle; seeding remaining entities together"
            );
            waves.push(cycle);
            break;
        }
        for e in &ready {
            pending.remove(e.slug());
        }
        for deps in pending.values_mut() {
            for e in &ready {
                deps.remove(e.slug());
            }
        }
        waves.push(ready);
    }
    waves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityDeclaration, PropertyDeclaration};

    fn slugs<'a>(wave: &[&'a ResolvedEntity]) -> Vec<&'a str> {
        wave.iter().map(|e| e.slug()).collect()
    }

    #[test]
    fn waves_put_targets_first() {
        // declared in reverse dependency order on purpose
        let model = resolve(&[
            EntityDeclaration::new("OrderLine")
                .property(PropertyDeclaration::relation("order", "Order"))
                .property(PropertyDeclaration::relation("product", "Product")),
            EntityDeclaration::new("Order").property(PropertyDeclaration::relation("customer", "Customer")),
            EntityDeclaration::new("Product"),
            EntityDeclaration::new("Customer").property(PropertyDeclaration::relation("referrer", "Customer")),
        ])
        .unwrap();
        let waves = seed_waves(&model);
        assert_eq!(waves.len(), 3);
        assert_eq!(slugs(&waves[0]), vec!["products", "customers"]);
        assert_eq!(slugs(&waves[1]), vec!["orders"]);
        assert_eq!(slugs(&waves[2]), vec!["order-lines"]);
    }

    #[test]
    fn cycles_end_up_in_a_final_wave() {
        let model = resolve(&[
            EntityDeclaration::new("Tag"),
            EntityDeclaration::new("Team").property(PropertyDeclaration::relation("lead", "Member")),
            EntityDeclaration::new("Member").property(PropertyDeclaration::relation("team", "Team")),
        ])
        .unwrap();
        let waves = seed_waves(&model);
        assert_eq!(waves.len(), 2);
        assert_eq!(slugs(&waves[0]), vec!["tags"]);
        assert_eq!(slugs(&waves[1]), vec!["teams", "members"]);
    }

    #[test]
    fn synthesized_relations_use_declared_target_seed_count() {
        let model = resolve(&[
            EntityDeclaration::new("Customer").seed_count(3),
            EntityDeclaration::new("Order").property(PropertyDeclaration::relation("customer", "Customer")),
        ])
        .unwrap();
        let orders = model.entity("orders").unwrap();
        for i in 0..100 {
            let row = synthesize_row(&model, orders, i).unwrap();
            let id = row["customer_id"].as_i64().unwrap();
            assert!((1..=3).contains(&id));
        }
    }
}
