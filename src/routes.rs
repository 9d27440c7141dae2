use crate::{
    api::{allowance, ctc, employee, leave, ltc, salary, travel},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter) // rate limiting
            .service(handlers::protected)
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::delete().to(leave::delete_leave)),
                    )
                    .service(
                        web::resource("/{id}/review").route(web::put().to(leave::review_leave)),
                    ),
            )
            .service(
                web::scope("/allowances")
                    .service(
                        web::resource("")
                            .route(web::post().to(allowance::create_allowance))
                            .route(web::get().to(allowance::list_allowances)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(allowance::get_allowance))
                            .route(web::delete().to(allowance::delete_allowance)),
                    )
                    .service(
                        web::resource("/{id}/review")
                            .route(web::put().to(allowance::review_allowance)),
                    )
                    .service(
                        web::resource("/{id}/voucher")
                            .route(web::put().to(allowance::annotate_allowance)),
                    )
                    .service(
                        web::resource("/{id}/attachment")
                            .route(web::get().to(allowance::allowance_attachment)),
                    ),
            )
            .service(
                web::scope("/fixed-allowances")
                    .service(
                        web::resource("")
                            .route(web::post().to(allowance::create_fixed_allowance))
                            .route(web::get().to(allowance::list_fixed_allowances)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(allowance::get_fixed_allowance))
                            .route(web::delete().to(allowance::delete_fixed_allowance)),
                    )
                    .service(
                        web::resource("/{id}/review")
                            .route(web::put().to(allowance::review_fixed_allowance)),
                    )
                    .service(
                        web::resource("/{id}/voucher")
                            .route(web::put().to(allowance::annotate_fixed_allowance)),
                    )
                    .service(
                        web::resource("/{id}/attachment")
                            .route(web::get().to(allowance::fixed_allowance_attachment)),
                    ),
            )
            .service(
                web::scope("/travel")
                    .service(
                        web::resource("")
                            .route(web::post().to(travel::create_travel))
                            .route(web::get().to(travel::list_travel)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(travel::get_travel))
                            .route(web::delete().to(travel::delete_travel)),
                    )
                    .service(
                        web::resource("/{id}/review").route(web::put().to(travel::review_travel)),
                    )
                    .service(
                        web::resource("/{id}/voucher")
                            .route(web::put().to(travel::annotate_travel)),
                    )
                    .service(
                        web::resource("/{id}/attachment")
                            .route(web::get().to(travel::travel_attachment)),
                    ),
            )
            .service(
                web::scope("/ltc")
                    .service(
                        web::resource("")
                            .route(web::post().to(ltc::create_ltc))
                            .route(web::get().to(ltc::list_ltc)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(ltc::get_ltc))
                            .route(web::delete().to(ltc::delete_ltc)),
                    )
                    .service(web::resource("/{id}/review").route(web::put().to(ltc::review_ltc)))
                    .service(web::resource("/{id}/voucher").route(web::put().to(ltc::annotate_ltc)))
                    .service(
                        web::resource("/{id}/attachment")
                            .route(web::get().to(ltc::ltc_attachment)),
                    ),
            )
            .service(
                web::scope("/salaries").service(
                    web::resource("")
                        .route(web::post().to(salary::create_salary))
                        .route(web::get().to(salary::list_salaries)),
                ),
            )
            .service(
                web::scope("/ctc")
                    .service(web::resource("/month").route(web::get().to(ctc::month_wise_ctc)))
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(ctc::employee_wise_ctc)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
