pub mod domain;
pub mod ports;
pub mod reporting;

pub use domain::{
    AuthSession, Capability, ContactInfo, Kayak, NewRental, NewUser, PasswordReset,
    PaymentMethod, Rental, RentalStatus, RentalType, Role, Tariff, User, UserCredentials,
    UserUpdate,
};
pub use ports::{DatabaseService, MailService, PortError, PortResult};
