use common::{RequestContext, Sku};
use criterion::{Criterion, criterion_group, criterion_main};
use fulfillment::{InMemoryInventoryService, OrderWorkflow, Product, StockCoordinator};
use order_store::InMemoryOrderStore;

type BenchWorkflow = OrderWorkflow<InMemoryOrderStore, InMemoryOrderStore, InMemoryInventoryService>;

fn workflow_with_stock(stock: u32) -> BenchWorkflow {
    let store = InMemoryOrderStore::new();
    let inventory = InMemoryInventoryService::new();
    inventory.put_product(Product::new("SKU-001", stock).with_version(1));
    OrderWorkflow::new(store.clone(), store, StockCoordinator::new(inventory))
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = RequestContext::anonymous();

    c.bench_function("workflow/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let workflow = workflow_with_stock(100);
                workflow
                    .create_order(&ctx, Sku::new("SKU-001"), 1)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_update_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = RequestContext::anonymous();

    c.bench_function("workflow/create_update_cancel", |b| {
        b.iter(|| {
            rt.block_on(async {
                let workflow = workflow_with_stock(100);
                let order = workflow
                    .create_order(&ctx, Sku::new("SKU-001"), 5)
                    .await
                    .unwrap();
                workflow
                    .update_order_quantity(&ctx, order.id(), 8)
                    .await
                    .unwrap();
                workflow
                    .update_order_quantity(&ctx, order.id(), 3)
                    .await
                    .unwrap();
                workflow.cancel_order(&ctx, order.id()).await.unwrap();
            });
        });
    });
}

fn bench_list_orders_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = RequestContext::anonymous();
    let workflow = workflow_with_stock(1_000);
    rt.block_on(async {
        for _ in 0..100 {
            workflow
                .create_order(&ctx, Sku::new("SKU-001"), 1)
                .await
                .unwrap();
        }
    });

    c.bench_function("workflow/list_orders_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                workflow.list_orders().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_create_update_cancel,
    bench_list_orders_100
);
criterion_main!(benches);
