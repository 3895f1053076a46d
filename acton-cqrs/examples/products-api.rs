//! Product catalog API bound through acton-cqrs
//!
//! ```bash
//! cargo run --example products-api
//!
//! curl -i -X POST localhost:8080/api/v1/catalogs/products \
//!     -H 'content-type: application/json' \
//!     -d '{"name":"Desk","category_id":"5b0c6a4e-4b36-4fd4-9a52-6f1f8d8c1a10","price":249.0}'
//!
//! curl -i localhost:8080/api/v1/catalogs/products/<id>
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use acton_cqrs::prelude::*;
use dashmap::DashMap;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

const PRODUCTS: &str = "/api/v1/catalogs/products";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProductDto {
    id: Uuid,
    name: String,
    category_id: Uuid,
    price: f64,
    description: Option<String>,
}

type Catalog = Arc<DashMap<Uuid, ProductDto>>;

// ============================================================================
// Create product
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateProductRequest {
    name: String,
    category_id: Uuid,
    price: f64,
    description: Option<String>,
}

#[derive(Debug)]
struct CreateProduct {
    id: Uuid,
    name: String,
    category_id: Uuid,
    price: f64,
    description: Option<String>,
}

impl From<CreateProductRequest> for CreateProduct {
    fn from(request: CreateProductRequest) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: request.name,
            category_id: request.category_id,
            price: request.price,
            description: request.description,
        }
    }
}

impl Request for CreateProduct {
    const NAME: &'static str = "CreateProduct";
    type Result = Uuid;
}

impl Command for CreateProduct {}

#[derive(Debug, Serialize)]
struct CreateProductResponse {
    id: Uuid,
}

struct CreateProductHandler {
    catalog: Catalog,
}

#[async_trait]
impl CommandHandler<CreateProduct> for CreateProductHandler {
    async fn handle(
        &self,
        command: CreateProduct,
        _cancel: CancellationToken,
    ) -> std::result::Result<Uuid, Failure> {
        let duplicate = self
            .catalog
            .iter()
            .any(|entry| entry.value().name.eq_ignore_ascii_case(&command.name));
        if duplicate {
            return Err(Failure::conflict_on(
                "name",
                format!("a product named '{}' already exists", command.name),
            ));
        }

        self.catalog.insert(
            command.id,
            ProductDto {
                id: command.id,
                name: command.name,
                category_id: command.category_id,
                price: command.price,
                description: command.description,
            },
        );
        info!(product_id = %command.id, "Product created");

        Ok(command.id)
    }
}

fn create_product_rules() -> RuleSet<CreateProduct> {
    RuleSet::new()
        .not_empty("name", |c: &CreateProduct| &c.name)
        .max_length("name", |c: &CreateProduct| c.name.as_str(), 120)
        .not_nil("category_id", |c: &CreateProduct| c.category_id)
        .range("price", |c: &CreateProduct| c.price, 0.01, 1_000_000.0)
}

// ============================================================================
// Get product by id
// ============================================================================

#[derive(Debug)]
struct GetProductById {
    id: Uuid,
}

impl Request for GetProductById {
    const NAME: &'static str = "GetProductById";
    type Result = ProductDto;
}

impl Query for GetProductById {}

#[derive(Debug, Serialize)]
struct GetProductByIdResponse {
    product: ProductDto,
}

impl From<ProductDto> for GetProductByIdResponse {
    fn from(product: ProductDto) -> Self {
        Self { product }
    }
}

struct GetProductByIdHandler {
    catalog: Catalog,
}

#[async_trait]
impl QueryHandler<GetProductById> for GetProductByIdHandler {
    async fn handle(
        &self,
        query: GetProductById,
        _cancel: CancellationToken,
    ) -> std::result::Result<ProductDto, Failure> {
        self.catalog
            .get(&query.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Failure::not_found("Product", query.id))
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn app(config: &Config, catalog: Catalog) -> Result<Router> {
    let registry = Arc::new(HandlerRegistry::new());
    registry.register_command::<CreateProduct, _>(CreateProductHandler {
        catalog: catalog.clone(),
    })?;
    registry.register_validator(create_product_rules())?;
    registry.register_query::<GetProductById, _>(GetProductByIdHandler { catalog })?;

    let binder = EndpointBinder::from_config(registry, config);

    let create = binder.bind_command_with_result(
        PRODUCTS,
        StatusCode::CREATED,
        Projection::with(|Json(request): Json<CreateProductRequest>| CreateProduct::from(request)),
        Projection::with(|id: Uuid| CreateProductResponse { id }),
    )?;

    let get_by_id = binder.bind_query(
        &format!("{PRODUCTS}/{{id}}"),
        Projection::with(|Path(id): Path<Uuid>| GetProductById { id }),
        Projection::<ProductDto, GetProductByIdResponse>::convert(),
    )?;

    for endpoint in [create.metadata(), get_by_id.metadata()] {
        debug!(
            name = endpoint.name(),
            display_name = endpoint.display_name(),
            produces = ?endpoint.produces(),
            "Endpoint metadata"
        );
    }

    Ok(Router::new()
        .map_endpoint(&create)
        .map_endpoint(&get_by_id))
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for Ctrl+C");
    }
    info!("Shutdown signal received, cancelling in-flight requests");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let shutdown = CancellationToken::new();
    let app = app(&config, Arc::new(DashMap::new()))?
        .layer(Extension(shutdown.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    let listener = TcpListener::bind(addr).await?;
    info!("{} listening on {}", config.service.name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}
