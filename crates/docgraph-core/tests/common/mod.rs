//! Shared order/customer/product model used across the graph tests

#![allow(dead_code)]

use std::collections::HashMap;

use bson::{doc, Document};
use docgraph_core::errors::{DgError, DgErrorKind, DocGraphError, Result};
use docgraph_core::model::relation::{self, Field, Target};
use docgraph_core::model::{Node, Object, Relations, StorableObject};
use docgraph_core::Resolver;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Object for Customer {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl StorableObject for Customer {
    const COLLECTION: &'static str = "customers";
}

impl Relations for Customer {}

/// Referenced from orders by identity only; lives in "products"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub price: i64,
}

impl Object for Product {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Relations for Product {}

/// Nested record, not an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    pub product: Product,
    pub quantity: i64,
}

fn line_product(line: &mut Line) -> Vec<&mut dyn Node> {
    relation::object(&mut line.product)
}

impl Relations for Line {
    const FIELDS: &'static [Field<Self>] = &[Field::referenced("product", "products", line_product)];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    pub number: String,
    pub customer: Customer,
    pub reviewer: Option<Customer>,
    pub gifts: Vec<Product>,
    pub lines: Vec<Line>,
}

impl Object for Order {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl StorableObject for Order {
    const COLLECTION: &'static str = "orders";
}

fn order_customer(order: &mut Order) -> Vec<Target<'_>> {
    relation::entity(&mut order.customer)
}

fn order_reviewer(order: &mut Order) -> Vec<Target<'_>> {
    relation::optional_entity(&mut order.reviewer)
}

fn order_gifts(order: &mut Order) -> Vec<&mut dyn Node> {
    relation::objects(&mut order.gifts)
}

fn order_lines(order: &mut Order) -> Vec<&mut dyn docgraph_core::model::Graph> {
    relation::nested_all(&mut order.lines)
}

impl Relations for Order {
    const FIELDS: &'static [Field<Self>] = &[
        Field::embedded("customer", order_customer),
        Field::embedded("reviewer", order_reviewer),
        Field::referenced("gifts", "products", order_gifts),
        Field::nested("lines", order_lines),
    ];
}

pub fn customer(id: &str, name: &str) -> Customer {
    Customer {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

pub fn product(id: &str, title: &str, price: i64) -> Product {
    Product {
        id: id.to_string(),
        title: title.to_string(),
        price,
    }
}

pub fn stub<T: Object + Default>(id: &str) -> T {
    let mut value = T::default();
    value.set_id(id.to_string());
    value
}

/// Resolver backed by a map of (collection, id) to document
#[derive(Default)]
pub struct MapResolver {
    pub documents: HashMap<(String, String), Document>,
    pub calls: Vec<(String, String)>,
    pub fail_on: Option<String>,
}

impl MapResolver {
    pub fn with_customer(mut self, customer: &Customer) -> Self {
        self.documents.insert(
            (Customer::COLLECTION.to_string(), customer.id.clone()),
            doc! { "_id": &customer.id, "name": &customer.name, "email": &customer.email },
        );
        self
    }

    pub fn with_product(mut self, product: &Product) -> Self {
        self.documents.insert(
            ("products".to_string(), product.id.clone()),
            doc! { "_id": &product.id, "title": &product.title, "price": product.price },
        );
        self
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail_on = Some(id.to_string());
        self
    }
}

impl Resolver for MapResolver {
    fn resolve(&mut self, collection: &str, target: &mut dyn Node) -> Result<()> {
        let id = target.identity().to_string();
        self.calls.push((collection.to_string(), id.clone()));

        if self.fail_on.as_deref() == Some(id.as_str()) {
            return Err(DgError::new(DgErrorKind::Connection).with_message("link down"));
        }

        let document = self
            .documents
            .get(&(collection.to_string(), id.clone()))
            .cloned()
            .ok_or_else(|| DocGraphError::NoResults {
                collection: collection.to_string(),
                id: Some(id),
            })?;

        target.hydrate(document)
    }
}
