pub mod chat;
pub mod wsroute;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat")
            .service(chat::send_message)
            .service(chat::get_history)
            .service(chat::mark_read)
            .service(wsroute::ws_handler),
    )
    .route("/health", web::get().to(|| async { "OK" }));
}
