#![allow(dead_code)]

use reqwest::{Method, RequestBuilder};
use rust_decimal::Decimal;
use sgq_service::config::SgqConfig;
use sgq_service::middleware::{ACCESS_LEVEL_HEADER, OPERATOR_ID_HEADER};
use sgq_service::models::{Client, Product, Service};
use sgq_service::startup::{AppState, Application};
use sgq_service::store::{Datastore, MemoryStore, Repositories, Repository};

pub const STAFF_ID: &str = "emp-staff";
pub const ADMIN_ID: &str = "emp-admin";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub repos: Repositories,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Boots the real application on a random port with an in-memory datastore.
    pub async fn spawn_with(configure: impl FnOnce(&mut SgqConfig)) -> Self {
        service_core::observability::init_metrics();

        let mut config = SgqConfig::in_memory();
        configure(&mut config);

        let app = Application::build_with_datastore(config, Datastore::Memory(MemoryStore::new()))
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let repos = app.state().repos.clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            repos,
            client,
        }
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.address, path))
    }

    /// Request made by a regular employee.
    pub fn staff(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .header(OPERATOR_ID_HEADER, STAFF_ID)
            .header(ACCESS_LEVEL_HEADER, "funcionario")
    }

    /// Request made by an administrator.
    pub fn admin(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .header(OPERATOR_ID_HEADER, ADMIN_ID)
            .header(ACCESS_LEVEL_HEADER, "admin")
    }

    pub async fn seed_client(&self, id: &str, name: &str) -> Client {
        seed_client(&self.repos, id, name).await
    }

    pub async fn seed_product(&self, id: &str, name: &str, quantity: i64, price: i64) -> Product {
        seed_product(&self.repos, id, name, quantity, price).await
    }

    pub async fn seed_service(&self, id: &str, title: &str, price: i64) -> Service {
        seed_service(&self.repos, id, title, price).await
    }

    pub async fn stock_of(&self, product_id: &str) -> i64 {
        stock_of(&self.repos, product_id).await
    }
}

/// Application state on a fresh in-memory datastore, for driving services
/// without HTTP.
pub fn memory_state(configure: impl FnOnce(&mut SgqConfig)) -> AppState {
    let mut config = SgqConfig::in_memory();
    configure(&mut config);
    AppState::new(config, Datastore::Memory(MemoryStore::new()))
}

pub async fn seed_client(repos: &Repositories, id: &str, name: &str) -> Client {
    let client = Client {
        id: id.to_string(),
        name: name.to_string(),
        nif: format!("NIF-{}", id),
        email: None,
        phone: Some("+244 923 000 000".to_string()),
        address: None,
    };
    repos.clients.insert(&client).await.expect("Failed to seed client");
    client
}

pub async fn seed_product(
    repos: &Repositories,
    id: &str,
    name: &str,
    quantity: i64,
    price: i64,
) -> Product {
    let product = Product {
        id: id.to_string(),
        name: name.to_string(),
        sku: None,
        quantity,
        cost_price: Decimal::ZERO,
        sale_price: Decimal::from(price),
    };
    repos.products.insert(&product).await.expect("Failed to seed product");
    product
}

pub async fn seed_service(repos: &Repositories, id: &str, title: &str, price: i64) -> Service {
    let service = Service {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        price: Decimal::from(price),
        category: None,
    };
    repos.services.insert(&service).await.expect("Failed to seed service");
    service
}

pub async fn stock_of(repos: &Repositories, product_id: &str) -> i64 {
    repos
        .products
        .find(product_id)
        .await
        .expect("Failed to read product")
        .expect("Product not found")
        .quantity
}
