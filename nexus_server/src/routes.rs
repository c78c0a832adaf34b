//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use nexus_engine::{
    db_types::Role,
    traits::{InventoryManagement, OrderManagement, UserManagement},
    InventoryApi,
    OrderFlowApi,
    UserApi,
};

use crate::{
    auth::{JwtClaims, ACCESS_TOKEN_COOKIE},
    config::ServerOptions,
    data_objects::{DeleteItemRequest, ItemCreated, OrderCreated, OrderQuery, PlaceOrderRequest, UpdateStockRequest},
    errors::{AuthError, ServerError},
    helpers::bounded,
    oidc::OidcClient,
    session_routes::{login, logout, redirect},
    uploads::{read_submission, save_image},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Authenticated routes are wrapped in the authentication middleware, and routes with required roles in the ACL
// middleware as well. The last `wrap` runs first, so identity is always established before roles are checked.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]))
                    .wrap($crate::middleware::AuthenticationFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where authenticated) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AuthenticationFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Every path the server routes. A request that reaches the fallback resource for one of these paths used a method the
/// path does not support.
pub const KNOWN_PATHS: [&str; 10] =
    ["/health", "/items", "/items/add", "/items/update", "/items/delete", "/orders", "/me", "/login", "/redirect", "/logout"];

/// Registers every route against the backend `A`, followed by the 405 fallback for known paths.
pub fn configure_routes<A>(cfg: &mut web::ServiceConfig)
where A: InventoryManagement + OrderManagement + UserManagement + 'static {
    cfg.service(health)
        .service(ListItemsRoute::<A>::new())
        .service(AddItemRoute::<A>::new())
        .service(UpdateStockRoute::<A>::new())
        .service(DeleteItemRoute::<A>::new())
        .service(GetOrdersRoute::<A>::new())
        .service(PlaceOrderRoute::<A>::new())
        .service(DeleteOrderRoute::<A>::new())
        .service(MeRoute::<A>::new())
        .service(login)
        .service(redirect)
        .service(logout)
        .service(web::resource(KNOWN_PATHS.to_vec()).to(method_not_allowed));
}

pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ServerError> {
    debug!("💻️ {} is not supported on {}", req.method(), req.path());
    Err(ServerError::MethodNotAllowed)
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Items  ----------------------------------------------------
route!(list_items => Get "/items" impl InventoryManagement);
/// Returns the full catalog, ordered by item id. No authentication is required.
pub async fn list_items<B: InventoryManagement>(
    api: web::Data<InventoryApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET items");
    let items = bounded(options.request_timeout, "list items", api.list_items()).await?;
    Ok(HttpResponse::Ok().json(items))
}

route!(add_item => Post "/items/add" impl InventoryManagement where requires [Role::Admin]);
/// Adds an item to the catalog. The body is either JSON or a multipart form with an optional `image` file.
///
/// Item names are unique, ignoring case. If an image is supplied, it is saved once the item exists. Failing to save
/// the image does not fail the request.
pub async fn add_item<B: InventoryManagement>(
    req: HttpRequest,
    payload: web::Payload,
    claims: JwtClaims,
    api: web::Data<InventoryApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let submission = read_submission(req.headers(), payload).await?;
    debug!("💻️ {} is adding item '{}'", claims.subject(), submission.item.name);
    let operation = format!("add item '{}'", submission.item.name);
    let item_id = bounded(options.request_timeout, &operation, api.add_item(submission.item)).await?;
    info!("💻️ Item {item_id} added by {}", claims.subject());
    if let Some(image) = submission.image {
        match save_image(&options.uploads_dir, item_id, &image).await {
            Ok(url) => {
                let operation = format!("set image for item {item_id}");
                if let Err(e) = bounded(options.request_timeout, &operation, api.set_item_image(item_id, &url)).await {
                    warn!("💻️ Item {item_id} was created, but its image could not be recorded. {e}");
                }
            },
            Err(e) => warn!("💻️ Item {item_id} was created, but its image could not be saved. {e}"),
        }
    }
    Ok(HttpResponse::Created().json(ItemCreated { item_id }))
}

route!(update_stock => Post "/items/update" impl InventoryManagement where requires [Role::Admin]);
/// Overwrites an item's stock level and returns the updated catalog.
pub async fn update_stock<B: InventoryManagement>(
    body: web::Json<UpdateStockRequest>,
    api: web::Data<InventoryApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let UpdateStockRequest { item_id, stock } = body.into_inner();
    if stock < 0 {
        return Err(ServerError::InvalidRequest(format!("Stock cannot be negative, but was {stock}.")));
    }
    debug!("💻️ Setting stock for item {item_id} to {stock}");
    let operation = format!("update stock for item {item_id}");
    bounded(options.request_timeout, &operation, api.update_item_stock(item_id, stock)).await?;
    let items = bounded(options.request_timeout, "list items", api.list_items()).await?;
    Ok(HttpResponse::Ok().json(items))
}

route!(delete_item => Post "/items/delete" impl InventoryManagement where requires [Role::Admin]);
pub async fn delete_item<B: InventoryManagement>(
    body: web::Json<DeleteItemRequest>,
    api: web::Data<InventoryApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let item_id = body.item_id;
    debug!("💻️ Deleting item {item_id}");
    bounded(options.request_timeout, &format!("delete item {item_id}"), api.delete_item(item_id)).await?;
    let items = bounded(options.request_timeout, "list items", api.list_items()).await?;
    Ok(HttpResponse::Ok().json(items))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(get_orders => Get "/orders" impl OrderManagement, InventoryManagement where authenticated);
/// Without an `order_id`, returns the caller's orders. With one, returns that order and its lines, provided the caller
/// placed it.
pub async fn get_orders<B: OrderManagement + InventoryManagement>(
    claims: JwtClaims,
    query: web::Query<OrderQuery>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = claims.subject();
    match query.order_id {
        Some(order_id) => {
            debug!("💻️ GET order #{order_id} for {user_id}");
            let order =
                bounded(options.request_timeout, &format!("fetch order #{order_id}"), api.fetch_order(order_id)).await?;
            if !order.order.is_owned_by(user_id) {
                debug!("💻️ {user_id} tried to read order #{order_id}, which belongs to someone else");
                return Err(ServerError::Forbidden(format!("Order #{order_id} belongs to another user.")));
            }
            Ok(HttpResponse::Ok().json(order))
        },
        None => {
            debug!("💻️ GET orders for {user_id}");
            let operation = format!("fetch orders for {user_id}");
            let orders = bounded(options.request_timeout, &operation, api.orders_for_user(user_id)).await?;
            Ok(HttpResponse::Ok().json(orders))
        },
    }
}

route!(place_order => Post "/orders" impl OrderManagement, InventoryManagement where authenticated);
/// Places an order for the caller. Repeated item ids are merged before the order reaches the store, which either
/// commits every line or none of them.
pub async fn place_order<B: OrderManagement + InventoryManagement>(
    claims: JwtClaims,
    body: web::Json<PlaceOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = claims.subject();
    let lines = body.coalesce()?;
    debug!("💻️ {user_id} is placing an order with {} lines", lines.len());
    let operation = format!("place order for {user_id} with items {:?}", lines.keys().collect::<Vec<_>>());
    let order_id = bounded(options.request_timeout, &operation, api.place_order(user_id, &lines)).await?;
    Ok(HttpResponse::Created().json(OrderCreated { order_id }))
}

route!(delete_order => Delete "/orders" impl OrderManagement, InventoryManagement where authenticated);
/// Deletes one of the caller's orders. Stock is not returned to the catalog.
pub async fn delete_order<B: OrderManagement + InventoryManagement>(
    claims: JwtClaims,
    query: web::Query<OrderQuery>,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = claims.subject();
    let order_id = query.order_id.ok_or_else(|| ServerError::InvalidRequest("order_id is required.".into()))?;
    let order = bounded(options.request_timeout, &format!("fetch order #{order_id}"), api.fetch_order(order_id)).await?;
    if !order.order.is_owned_by(user_id) {
        debug!("💻️ {user_id} tried to delete order #{order_id}, which belongs to someone else");
        return Err(ServerError::Forbidden(format!("Order #{order_id} belongs to another user.")));
    }
    bounded(options.request_timeout, &format!("delete order #{order_id}"), api.delete_order(order_id)).await?;
    info!("💻️ Order #{order_id} deleted by {user_id}");
    Ok(HttpResponse::NoContent().finish())
}

//----------------------------------------------   Profile  ----------------------------------------------------
route!(me => Get "/me" impl UserManagement where authenticated);
/// Fetches the caller's profile from the identity provider, saves it, and returns it.
///
/// The provider's profile endpoint needs the access token from the login, which is kept in a cookie.
pub async fn me<B: UserManagement>(
    req: HttpRequest,
    claims: JwtClaims,
    api: web::Data<UserApi<B>>,
    oidc: web::Data<OidcClient>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let user_id = claims.subject();
    let access_token = req
        .cookie(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ServerError::AuthenticationError(AuthError::NoCredential))?;
    let profile = oidc.fetch_profile(&options.profile_url, &access_token).await?;
    let operation = format!("save profile for {user_id}");
    let user = bounded(options.request_timeout, &operation, api.sync_profile(user_id, profile)).await?;
    debug!("💻️ Profile for {user_id} synchronised");
    Ok(HttpResponse::Ok().json(user.profile))
}
