//! Order intake driven by a schema.
//!
//! Demonstrates:
//! - Declaring work item types with `define_workitem!`
//! - Building a schema and saving it as JSON
//! - Walking a session through incomplete items and filling in data
//! - Schema limits rejecting an edit

use eda::prelude::*;
use std::sync::Arc;

define_workitem!(Order);
define_workitem!(LineItem);
define_workitem!(Note);
define_workitem!(Shipment);

fn order_schema() -> Result<WorkflowSchema, EngineError> {
    // Strict mode wants every type declared up front.
    Ok(WorkflowSchema::builder()
        .workitem_type(Order::NAME)
        .workitem_type(LineItem::NAME)
        .workitem_type(Note::NAME)
        .workitem_type(Shipment::NAME)
        .child_schema(Order::NAME, LineItem::NAME, 1, None)
        .child_schema(Order::NAME, Shipment::NAME, 1, Some(1))
        .child_schema(LineItem::NAME, Note::NAME, 0, Some(2))
        .config(SchemaConfig::strict())
        .build()?)
}

fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let schema = Arc::new(order_schema()?);
    let schema_path = std::env::temp_dir().join("eda-demo/order_schema.json");
    save_schema(&schema, &schema_path)?;
    println!("Schema saved to {}", schema_path.display());

    let mut session = WorkflowSession::builder()
        .schema(Arc::clone(&schema))
        .root_type(Order::NAME)
        .build()?;

    // A second line item on top of the required one.
    session.add_child(LineItem::NAME)?;

    let skus = ["A-113", "B-207"];
    let mut next_sku = skus.iter();
    while let Some(id) = session.advance_to_incomplete(None)? {
        let path = session.current_path()?;
        let item = session.current_item_mut()?;
        if item.workitem_type() == LineItem::NAME {
            if let Some(sku) = next_sku.next() {
                item.set_data("sku", *sku);
                item.set_data("quantity", 1);
            }
        } else if item.workitem_type() == Shipment::NAME {
            item.set_data("carrier", "post");
        }
        println!("Filled {} ({})", path, id);
        session.complete_current()?;
    }

    session.goto("/LineItem[0]")?;
    session.add_child(Note::NAME)?;
    session.add_child(Note::NAME)?;
    if let Err(err) = session.add_child(Note::NAME) {
        println!("Third note rejected: {}", err);
    }

    let tree = session.into_tree();
    for id in Navigator::new(&tree).walk(tree.root())? {
        let item = tree.item(id)?;
        println!(
            "{:<24} complete={} data={:?}",
            tree.absolute_path(id)?.to_string(),
            item.is_complete(),
            item.data_map()
        );
    }
    Ok(())
}
