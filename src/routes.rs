use crate::api::{advance, attendance, expense, salary, worker};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str) {
    cfg.service(
        web::scope(api_prefix)
            .service(
                web::scope("/workers")
                    // /workers
                    .service(
                        web::resource("")
                            .route(web::post().to(worker::create_worker))
                            .route(web::get().to(worker::list_workers)),
                    )
                    // /workers/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(worker::get_worker))
                            .route(web::put().to(worker::update_worker)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::mark_attendance))
                            .route(web::get().to(attendance::list_attendance)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(attendance::update_attendance))
                            .route(web::delete().to(attendance::delete_attendance)),
                    ),
            )
            .service(
                web::scope("/advances")
                    .service(
                        web::resource("")
                            .route(web::post().to(advance::create_advance))
                            .route(web::get().to(advance::list_advances)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(advance::update_advance))
                            .route(web::delete().to(advance::delete_advance)),
                    ),
            )
            .service(
                web::scope("/expenses")
                    .service(
                        web::resource("")
                            .route(web::post().to(expense::create_expense))
                            .route(web::get().to(expense::list_expenses)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(expense::update_expense))
                            .route(web::delete().to(expense::delete_expense)),
                    ),
            )
            .service(
                web::scope("/salary")
                    .service(web::resource("").route(web::post().to(salary::create_salary)))
                    .service(web::resource("/pay").route(web::post().to(salary::pay_worker)))
                    .service(
                        web::resource("/breakdown/{worker_id}")
                            .route(web::get().to(salary::get_breakdown)),
                    )
                    .service(
                        web::resource("/periods/{worker_id}")
                            .route(web::get().to(salary::paid_periods)),
                    )
                    .service(
                        web::resource("/locked/{worker_id}")
                            .route(web::get().to(salary::is_locked)),
                    )
                    .service(
                        web::resource("/worker/{worker_id}")
                            .route(web::get().to(salary::list_salaries)),
                    )
                    .service(
                        web::resource("/{id}/payments")
                            .route(web::post().to(salary::issue_salary))
                            .route(web::get().to(salary::list_payments)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(salary::get_salary))),
            ),
    );
}
