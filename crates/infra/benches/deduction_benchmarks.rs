use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use rust_decimal::Decimal;
use stockflow_core::{BundleId, InventoryStockId, Quantity, RecipeId, ReferenceId, StoreId};
use stockflow_events::{EventEnvelope, InMemoryEventBus};
use stockflow_infra::{
    CatalogStore, EngineConfig, InMemoryCatalogStore, InMemoryLedgerStore, InMemoryMappingStore,
    InventoryEngine,
};
use stockflow_inventory::{
    BundleComponent, InventoryEvent, InventoryStockItem, ProductBundle, Recipe, RecipeIngredient,
    SaleLineItem, expand,
};

type Engine = InventoryEngine<
    Arc<InMemoryLedgerStore>,
    Arc<InMemoryMappingStore>,
    Arc<InMemoryCatalogStore>,
    Arc<InMemoryEventBus<EventEnvelope<InventoryEvent>>>,
>;

/// Engine with one recipe of `ingredients` lines, each mapped to its own item.
fn setup(ingredients: usize) -> (Engine, StoreId, RecipeId) {
    let engine = InventoryEngine::new(
        InMemoryLedgerStore::arc(),
        InMemoryMappingStore::arc(),
        InMemoryCatalogStore::arc(),
        Arc::new(InMemoryEventBus::new()),
        EngineConfig::default(),
    )
    .unwrap();
    let store = StoreId::new();

    let mut lines = Vec::with_capacity(ingredients);
    for i in 0..ingredients {
        let name = format!("ingredient {i}");
        let item = InventoryStockItem::new(
            InventoryStockId::new(),
            store,
            name.clone(),
            "kg",
            Quantity::from_whole(1_000_000),
            4,
        )
        .unwrap();
        let id = engine.ledger().insert_item(item).unwrap().id_typed();
        engine
            .resolver()
            .register(store, &name, "g", id, Decimal::new(1, 3))
            .unwrap();
        lines.push(RecipeIngredient::new(name, "g", Quantity::from_decimal(Decimal::new(125, 1))));
    }

    let recipe = Recipe::new(RecipeId::new(), store, "Bench", lines).unwrap();
    let recipe_id = recipe.id;
    engine.catalog().insert_recipe(recipe).unwrap();
    (engine, store, recipe_id)
}

fn bench_commit_and_void(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_and_void");

    for ingredients in [1usize, 5, 20] {
        group.throughput(Throughput::Elements(ingredients as u64));
        group.bench_with_input(BenchmarkId::new("ingredients", ingredients), &ingredients, |b, &n| {
            let (engine, store, recipe) = setup(n);
            let line = [SaleLineItem::recipe(recipe, Quantity::from_whole(2))];
            b.iter(|| {
                let reference = ReferenceId::generate();
                engine.commit_sale(reference, store, black_box(&line)).unwrap();
                engine.void_sale(reference).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_availability_preview(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability_preview");

    for ingredients in [1usize, 5, 20] {
        group.bench_with_input(BenchmarkId::new("ingredients", ingredients), &ingredients, |b, &n| {
            let (engine, store, recipe) = setup(n);
            let line = [SaleLineItem::recipe(recipe, Quantity::ONE)];
            b.iter(|| engine.check_availability(store, black_box(&line)).unwrap());
        });
    }

    group.finish();
}

fn bench_bundle_expansion_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_expansion");

    for depth in [1usize, 4, 16] {
        let catalog = InMemoryCatalogStore::new();
        let store = StoreId::new();
        let leaf = ProductBundle::new(BundleId::new(), store, "leaf");
        catalog.insert_bundle(leaf.clone()).unwrap();
        catalog
            .add_component(BundleComponent::ingredient(leaf.id, "cup", "pcs", Quantity::ONE).unwrap())
            .unwrap();

        let mut top = leaf.id;
        for level in 0..depth {
            let parent = ProductBundle::new(BundleId::new(), store, format!("level {level}"));
            catalog.insert_bundle(parent.clone()).unwrap();
            catalog
                .add_component(BundleComponent::nested(parent.id, top, Quantity::from_whole(2)).unwrap())
                .unwrap();
            top = parent.id;
        }

        group.bench_with_input(BenchmarkId::new("depth", depth), &top, |b, &top| {
            b.iter(|| expand(&catalog, black_box(top), Quantity::ONE).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_commit_and_void,
    bench_availability_preview,
    bench_bundle_expansion_depth
);
criterion_main!(benches);
