//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod course;
pub mod course_module;
pub mod enrollment;
pub mod invoice;
pub mod lesson;
pub mod lesson_completion;
pub mod notification;
pub mod payment;
pub mod payment_item;
pub mod subscription;
pub mod system_log;
pub mod user;
pub mod user_theme;

// Re-export specific types to avoid conflicts
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use course::{Column as CourseColumn, Entity as Course, Model as CourseModel};
pub use course_module::{
    Column as CourseModuleColumn, Entity as CourseModule, Model as CourseModuleModel,
};
pub use enrollment::{Column as EnrollmentColumn, Entity as Enrollment, Model as EnrollmentModel};
pub use invoice::{Column as InvoiceColumn, Entity as Invoice, Model as InvoiceModel};
pub use lesson::{Column as LessonColumn, Entity as Lesson, Model as LessonModel};
pub use lesson_completion::{
    Column as LessonCompletionColumn, Entity as LessonCompletion, Model as LessonCompletionModel,
};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use payment_item::{
    Column as PaymentItemColumn, Entity as PaymentItem, Model as PaymentItemModel,
};
pub use subscription::{
    Column as SubscriptionColumn, Entity as Subscription, Model as SubscriptionModel,
};
pub use system_log::{Column as SystemLogColumn, Entity as SystemLog, Model as SystemLogModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use user_theme::{Column as UserThemeColumn, Entity as UserTheme, Model as UserThemeModel};
