//! Example walking a container through its whole lifecycle
//!
//! Run with pretty logging:
//! ```bash
//! cargo run --example lifecycle --features logging-pretty
//! ```
//!
//! Run with JSON logging:
//! ```bash
//! cargo run --example lifecycle --features logging-json
//! ```

use bean_container::{
    BeanDefinition, BeanPostProcessor, BoxError, Container, ContainerEvent, SharedBean,
};
use std::sync::Arc;

struct PromotionService {
    bean_name: String,
}

struct ProductService {
    promotions: Arc<PromotionService>,
}

impl ProductService {
    fn after_properties_set(&self) -> Result<(), BoxError> {
        println!("  [ProductService] init, promotions wired: {}", self.promotions.bean_name);
        Ok(())
    }

    fn pre_destroy(&self) -> Result<(), BoxError> {
        println!("  [ProductService] pre-destroy");
        Ok(())
    }

    fn destroy(&self) -> Result<(), BoxError> {
        println!("  [ProductService] destroy");
        Ok(())
    }
}

/// Prints every bean passing through initialization
struct AnnouncingPostProcessor;

impl BeanPostProcessor for AnnouncingPostProcessor {
    fn before_initialization(&self, bean: SharedBean, name: &str) -> Result<SharedBean, BoxError> {
        println!("  [PostProcessor] before {name}");
        Ok(bean)
    }

    fn after_initialization(&self, bean: SharedBean, name: &str) -> Result<SharedBean, BoxError> {
        println!("  [PostProcessor] after {name}");
        Ok(bean)
    }
}

fn main() -> bean_container::Result<()> {
    #[cfg(feature = "logging")]
    {
        bean_container::logging::init();
    }

    println!("=== Bean Container Lifecycle Demo ===\n");

    let container = Container::builder()
        .with_post_processor(AnnouncingPostProcessor)
        .with_listener(|event: &ContainerEvent| {
            if *event == ContainerEvent::Closed {
                println!("  [Listener] >> container closed");
            }
        })
        .build();

    println!("1. Registering definitions");
    container.register_all([
        BeanDefinition::singleton("productService", |ctx| {
            Ok(ProductService {
                promotions: ctx.get("promotionService")?,
            })
        })
        .depends_on("promotionService")
        .on_init(ProductService::after_properties_set)
        .on_pre_destroy(ProductService::pre_destroy)
        .on_destroy(ProductService::destroy)
        .build(),
        BeanDefinition::singleton("promotionService", |ctx| {
            Ok(PromotionService {
                bean_name: ctx.bean_name().to_string(),
            })
        })
        .build(),
        BeanDefinition::singleton("auditLog", |_| {
            println!("  [auditLog] created on first use");
            Ok(Vec::<String>::new())
        })
        .lazy(true)
        .build(),
    ])?;
    println!("   Order: {:?}\n", container.instantiation_order()?);

    println!("2. Starting");
    container.start()?;
    println!("   Realized: {:?}\n", container.realized_beans());

    println!("3. Checking beans");
    let products = container.get::<ProductService>("productService")?;
    let promotions = container.get::<PromotionService>("promotionService")?;
    println!("   ProductService exists, promotions shared: {}", Arc::ptr_eq(&products.promotions, &promotions));
    println!("   PromotionService bean name: {}", promotions.bean_name);
    println!("   auditLog state: {:?}", container.bean_state("auditLog"));
    let _ = container.get::<Vec<String>>("auditLog")?;
    println!("   auditLog state: {:?}\n", container.bean_state("auditLog"));

    println!("4. Detecting a cycle in a second container");
    let broken = Container::new();
    broken.register_all([
        BeanDefinition::singleton("a", |_| Ok(())).depends_on("b").build(),
        BeanDefinition::singleton("b", |_| Ok(())).depends_on("a").build(),
    ])?;
    if let Err(err) = broken.start() {
        println!("   {err}\n");
    }

    println!("5. Shutting down");
    container.shutdown()?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
