//! 内置信息收集模块
pub mod basic;
pub mod cookies;
pub mod git;
pub mod methods;
pub mod robots;

pub use self::basic::BasicInfo;
pub use self::cookies::CookieFlags;
pub use self::git::{Commit, GitExposure};
pub use self::methods::HttpMethods;
pub use self::robots::{RobotsRules, RobotsTxt};

use super::techs::{Joomla, WordPress};
use super::{InfoModule, ModuleRegistry};

/// 注册全部内置信息模块（技术专属模块由扫描器在技术识别之后运行）
pub fn default_info_modules() -> ModuleRegistry<dyn InfoModule> {
    ModuleRegistry::<dyn InfoModule>::new()
        .with("basic", || Box::new(BasicInfo))
        .with("robots.txt", || Box::new(RobotsTxt))
        .with("methods", || Box::new(HttpMethods))
        .with("cookies", || Box::new(CookieFlags))
        .with("git", || Box::new(GitExposure))
        .with("wordpress", || Box::new(WordPress))
        .with("joomla", || Box::new(Joomla))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = default_info_modules();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["basic", "robots.txt", "methods", "cookies", "git", "wordpress", "joomla"]
        );

        let gated: Vec<String> = registry
            .instantiate_all()
            .iter()
            .filter_map(|module| module.technology().map(str::to_string))
            .collect();
        assert_eq!(gated, vec!["WordPress", "Joomla"]);
    }
}
