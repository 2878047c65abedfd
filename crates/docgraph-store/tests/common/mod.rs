//! Shop model shared by the repository tests

#![allow(dead_code)]

use docgraph_core::model::relation::{self, Field, Target};
use docgraph_core::model::{Graph, Node, Object, Relations, StorableObject};
use docgraph_store::{IdType, MemoryStore, RepoOptions, Repository};
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

impl StorableObject for Product {
    const COLLECTION: &'static str = "products";
}

impl Relations for Product {}

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

fn order_lines(order: &mut Order) -> Vec<&mut dyn Graph> {
    relation::nested_all(&mut order.lines)
}

impl Relations for Order {
    const FIELDS: &'static [Field<Self>] = &[
        Field::embedded("customer", order_customer),
        Field::nested("lines", order_lines),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

impl Object for Company {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl StorableObject for Company {
    const COLLECTION: &'static str = "companies";
}

impl Relations for Company {}

/// Person working for a company; itself the target of [`Doc::owner`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub company: Company,
}

impl Object for Person {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl StorableObject for Person {
    const COLLECTION: &'static str = "people";
}

fn person_company(person: &mut Person) -> Vec<Target<'_>> {
    relation::entity(&mut person.company)
}

impl Relations for Person {
    const FIELDS: &'static [Field<Self>] = &[Field::embedded("company", person_company)];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Doc {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub owner: Person,
}

impl Object for Doc {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl StorableObject for Doc {
    const COLLECTION: &'static str = "docs";
}

fn doc_owner(doc: &mut Doc) -> Vec<Target<'_>> {
    relation::entity(&mut doc.owner)
}

impl Relations for Doc {
    const FIELDS: &'static [Field<Self>] = &[Field::embedded("owner", doc_owner)];
}

/// Read-side projection of an order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub number: String,
    pub customer_name: String,
    pub items: i64,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            number: order.number,
            customer_name: order.customer.name,
            items: order.lines.iter().map(|line| line.quantity).sum(),
        }
    }
}

/// Shape of a `$count` stage result
#[derive(Debug, Default, Deserialize)]
pub struct Tally {
    pub total: i64,
}

impl Relations for Tally {}

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

pub fn order(number: &str, customer: Customer, lines: Vec<(Product, i64)>) -> Order {
    Order {
        id: String::new(),
        number: number.to_string(),
        customer,
        lines: lines
            .into_iter()
            .map(|(product, quantity)| Line { product, quantity })
            .collect(),
    }
}

/// Acme, Ann working there, and a doc owned by Ann
pub fn seed_chain(repo: &ShopRepo) {
    let acme = Company {
        id: "acme".to_string(),
        name: "Acme".to_string(),
    };
    let mut ann = Person {
        id: "ann".to_string(),
        name: "Ann".to_string(),
        company: acme.clone(),
    };
    let mut doc = Doc {
        id: "d1".to_string(),
        title: "Plan".to_string(),
        owner: ann.clone(),
    };
    repo.create(&mut acme.clone()).expect("seed company");
    repo.create(&mut ann).expect("seed person");
    repo.create(&mut doc).expect("seed doc");
}

pub type ShopRepo = Repository<MemoryStore>;

pub fn options(id_type: IdType) -> RepoOptions {
    RepoOptions {
        id_type,
        ..RepoOptions::default()
    }
}

pub fn memory_repo(options: RepoOptions) -> ShopRepo {
    Repository::with_store(MemoryStore::new(), options)
}

/// Ada and Grace as customers plus two products; `options` must use string ids
pub fn seeded_repo(options: RepoOptions) -> ShopRepo {
    let repo = memory_repo(options);
    let mut customers = vec![customer("c1", "Ada"), customer("c2", "Grace")];
    repo.create_many(&mut customers).expect("seed customers");
    let mut products = vec![product("p1", "Mug", 5), product("p2", "Desk", 300)];
    repo.create_many(&mut products).expect("seed products");
    repo
}
