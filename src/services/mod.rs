//! Business logic services

pub mod auth;
pub mod email;
pub mod library;
pub mod notifications;
pub mod reports;
pub mod roster;
pub mod scan;
pub mod scheduler;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub roster: roster::RosterService,
    pub scan: scan::ScanService,
    pub library: library::LibraryService,
    pub reports: reports::ReportsService,
    pub notifications: notifications::NotificationService,
}

impl Services {
    /// Create all services and start the notification worker
    pub fn new(repository: Repository, config: &AppConfig, mailer: Arc<dyn email::Mailer>) -> Self {
        let notifications =
            notifications::NotificationService::start(repository.clone(), mailer, &config.email);

        Self {
            auth: auth::AuthService::new(
                repository.clone(),
                config.auth.clone(),
                config.library.default_borrow_limit,
                notifications.clone(),
            ),
            roster: roster::RosterService::new(repository.clone()),
            scan: scan::ScanService::new(repository.clone(), config.scheduler.clone(), notifications.clone()),
            library: library::LibraryService::new(repository.clone(), config.library.clone(), notifications.clone()),
            reports: reports::ReportsService::new(repository, config.scheduler.clone(), notifications.clone()),
            notifications,
        }
    }

    pub fn scheduler(&self, config: &AppConfig) -> scheduler::Scheduler {
        scheduler::Scheduler::new(config.scheduler.clone(), self.reports.clone(), self.library.clone())
    }
}
